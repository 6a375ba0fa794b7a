//! Generation graph: a four-node intent router driven by completion replies.
//!
//! ```text
//! router ──"resume"──► resume_check ──PROCEED──► resume_maker ──► Finish
//!   │                      └──────otherwise─────────────────────► Finish
//!   ├────"cover"─────► cover_letter_writer ─────────────────────► Finish
//!   └────otherwise──────────────────────────────────────────────► Finish
//! ```
//!
//! Each node is one call to the [`CompletionModel`]; edges are picked by
//! substring matching on the reply. Execution is strictly sequential and no node
//! runs twice in one request.

use tracing::{debug, info};

use crate::generation::prompts::{
    render, COVER_LETTER_PROMPT_TEMPLATE, NO_OUTPUT, PROCEED_TOKEN, RESUME_CHECK_PROMPT_TEMPLATE,
    RESUME_MAKER_PROMPT_TEMPLATE, ROUTER_SYSTEM, UNKNOWN_INTENT_OUTPUT,
};
use crate::llm_client::{CompletionModel, LlmError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Router,
    ResumeCheck,
    ResumeMaker,
    CoverLetterWriter,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Resume,
    CoverLetter,
}

/// How a run ended. Every variant is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Drafted(Intent),
    /// The completeness gate answered with a list of missing sections.
    NeedsInformation,
    /// The router reply named neither document type.
    IntentUnresolved,
}

/// Per-request state. Lives only for one run.
#[derive(Debug, Clone)]
pub struct GraphState {
    pub user_input: String,
    pub next_step: NextStep,
    pub final_output: Option<String>,
}

impl GraphState {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            next_step: NextStep::Router,
            final_output: None,
        }
    }

    fn apply(&mut self, update: NodeUpdate) {
        self.next_step = update.next_step;
        if update.final_output.is_some() {
            self.final_output = update.final_output;
        }
    }
}

/// What a node hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeUpdate {
    next_step: NextStep,
    final_output: Option<String>,
}

impl NodeUpdate {
    fn goto(next_step: NextStep) -> Self {
        Self {
            next_step,
            final_output: None,
        }
    }

    fn finish(output: String) -> Self {
        Self {
            next_step: NextStep::Finish,
            final_output: Some(output),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphOutcome {
    pub output: String,
    pub termination: Termination,
    /// Nodes executed, in order.
    pub path: Vec<NextStep>,
}

// ────────────────────────────────────────────────────────────────────────────
// Edge decisions
// ────────────────────────────────────────────────────────────────────────────

/// "resume" is checked before "cover", so a reply naming both routes to the resume path.
fn route_intent(reply: &str) -> NodeUpdate {
    let decision = reply.trim().to_lowercase();
    if decision.contains("resume") {
        NodeUpdate::goto(NextStep::ResumeCheck)
    } else if decision.contains("cover") {
        NodeUpdate::goto(NextStep::CoverLetterWriter)
    } else {
        NodeUpdate::finish(UNKNOWN_INTENT_OUTPUT.to_string())
    }
}

/// Anything without the token is the model's own request for missing details.
fn gate_completeness(reply: &str) -> NodeUpdate {
    let content = reply.trim();
    if content.to_uppercase().contains(PROCEED_TOKEN) {
        NodeUpdate::goto(NextStep::ResumeMaker)
    } else {
        NodeUpdate::finish(content.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Nodes
// ────────────────────────────────────────────────────────────────────────────

async fn router_node(
    model: &dyn CompletionModel,
    state: &GraphState,
) -> Result<NodeUpdate, LlmError> {
    info!("router node");
    let reply = model.complete(ROUTER_SYSTEM, &state.user_input).await?;
    let update = route_intent(&reply);
    debug!(reply = %reply.trim(), next = ?update.next_step, "intent routed");
    Ok(update)
}

async fn resume_check_node(
    model: &dyn CompletionModel,
    state: &GraphState,
) -> Result<NodeUpdate, LlmError> {
    info!("resume check node");
    let prompt = render(RESUME_CHECK_PROMPT_TEMPLATE, &state.user_input);
    let reply = model.complete("", &prompt).await?;
    let update = gate_completeness(&reply);
    debug!(next = ?update.next_step, "completeness gate decided");
    Ok(update)
}

async fn resume_maker_node(
    model: &dyn CompletionModel,
    state: &GraphState,
) -> Result<NodeUpdate, LlmError> {
    info!("resume maker node");
    let prompt = render(RESUME_MAKER_PROMPT_TEMPLATE, &state.user_input);
    Ok(NodeUpdate::finish(model.complete("", &prompt).await?))
}

async fn cover_letter_writer_node(
    model: &dyn CompletionModel,
    state: &GraphState,
) -> Result<NodeUpdate, LlmError> {
    info!("cover letter writer node");
    let prompt = render(COVER_LETTER_PROMPT_TEMPLATE, &state.user_input);
    Ok(NodeUpdate::finish(model.complete("", &prompt).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Execution
// ────────────────────────────────────────────────────────────────────────────

fn termination_for(last: Option<NextStep>) -> Termination {
    match last {
        Some(NextStep::ResumeMaker) => Termination::Drafted(Intent::Resume),
        Some(NextStep::CoverLetterWriter) => Termination::Drafted(Intent::CoverLetter),
        Some(NextStep::ResumeCheck) => Termination::NeedsInformation,
        _ => Termination::IntentUnresolved,
    }
}

/// Runs the graph from the router to `Finish`.
///
/// Completion failures abort the run and propagate unchanged.
pub async fn run_graph(
    model: &dyn CompletionModel,
    user_input: &str,
) -> Result<GraphOutcome, LlmError> {
    let preview: String = user_input.chars().take(100).collect();
    info!(query = %preview, "processing generation request");

    let mut state = GraphState::new(user_input);
    let mut path = Vec::with_capacity(3);

    loop {
        let step = state.next_step;
        let update = match step {
            NextStep::Router => router_node(model, &state).await?,
            NextStep::ResumeCheck => resume_check_node(model, &state).await?,
            NextStep::ResumeMaker => resume_maker_node(model, &state).await?,
            NextStep::CoverLetterWriter => cover_letter_writer_node(model, &state).await?,
            NextStep::Finish => break,
        };
        debug_assert!(!path.contains(&step), "node {step:?} visited twice");
        path.push(step);
        state.apply(update);
    }

    let termination = termination_for(path.last().copied());
    info!(?termination, steps = path.len(), "generation graph finished");

    Ok(GraphOutcome {
        output: state.final_output.unwrap_or_else(|| NO_OUTPUT.to_string()),
        termination,
        path,
    })
}
