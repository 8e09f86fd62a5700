// Cross-cutting prompt fragments. Module-specific prompts live next to the
// module that sends them (e.g. profile/prompts.rs).

/// Instruction appended to every extraction prompt.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Only report values that appear verbatim or unambiguously in the document. \
    Use null for anything not stated. Never estimate GPAs, scores or dates.";
