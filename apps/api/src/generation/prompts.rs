// LLM prompt constants for the generation graph.
// Templates carry an `{user_input}` placeholder replaced before sending.

/// System prompt for intent classification. The raw request is sent as the user turn.
pub const ROUTER_SYSTEM: &str = "You are a helpful router agent. Your job is to analyze the user's input, \
    which contains job requirements and a specific task request. \
    Determine if the user wants a 'Resume' or a 'Cover Letter'. \
    Return ONLY the word 'resume' or 'cover_letter'.";

/// Completeness gate. The model either lists missing sections or answers `PROCEED`.
pub const RESUME_CHECK_PROMPT_TEMPLATE: &str = "You are a Resume Quality Checker. Analyze the following user input. \
Check if it contains sufficient information for: 1. Contact Info, 2. Skills, 3. Experience, 4. Education. \
If ANY of these are missing, list what is missing and ask the user to provide it. \
If ALL are present, return ONLY the word 'PROCEED'.

Input: {user_input}";

pub const RESUME_MAKER_PROMPT_TEMPLATE: &str = "You are an expert Resume Writer. \
Based on the following job requirements and user details, create a professional resume. \
Do not add anything if user has not given, if any section is missing ask from user and then only create the resume.

Input: {user_input}";

pub const COVER_LETTER_PROMPT_TEMPLATE: &str = "You are an expert Cover Letter Writer. \
Based on the following job requirements and user details, write a compelling cover letter. \
Do not make things on your own, cover letter should be as per the user details.

Input: {user_input}";

/// Token the completeness gate must return (case-insensitively) to continue.
pub const PROCEED_TOKEN: &str = "PROCEED";

/// Fixed output when the router reply names neither document type.
pub const UNKNOWN_INTENT_OUTPUT: &str = "Could not determine intent.";

/// Output when a run finishes without producing anything.
pub const NO_OUTPUT: &str = "No output generated";

pub fn render(template: &str, user_input: &str) -> String {
    template.replace("{user_input}", user_input)
}
