use crate::Mode;

/// Sent with every request regardless of mode.
pub const SYSTEM_INSTRUCTION: &str = "You are a professional AI Prompt Architect. \n\
Your job is to transform vague or weak user instructions into powerful, structured, high-performance prompts.\n\
\n\
You must:\n\
- Add missing details intelligently.\n\
- Never ask clarification questions before generating.\n\
- Assume reasonable defaults.\n\
- Structure prompts professionally.\n\
- Add sections like:\n   \
   ROLE\n   \
   OBJECTIVE\n   \
   CONTEXT\n   \
   REQUIREMENTS\n   \
   OUTPUT FORMAT\n   \
   CONSTRAINTS\n\
- End every response with:\n   \
   'If this is not aligned, tell me what to adjust and I will refine it.'\n\
\n\
Output only the final improved prompt.\n\
Do not explain your reasoning.";

/// Wrap the raw user input in the instruction for `mode`.
pub fn build_prompt(input: &str, mode: Mode) -> String {
    match mode {
        Mode::Improve => format!(
            "Rewrite this prompt to be clear, specific, include role definition, \
add constraints, add expected output format, and remove ambiguity:\n\n{input}"
        ),
        Mode::Idea => format!(
            "Generate a full, detailed prompt from this vague idea. Assume reasonable defaults, \
define target audience, features, edge cases, tech stack (if relevant), and output format. \
Do not ask questions first.\n\nIdea: {input}"
        ),
        Mode::Expert => format!(
            "Transform this input into a highly advanced, expert-level prompt. \
Include Role (Act as a senior ...), Context, Constraints, Structured output format, \
Examples (if useful), and Step-by-step reasoning requirement.\n\nInput: {input}"
        ),
    }
}
