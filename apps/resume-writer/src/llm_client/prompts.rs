// Shared prompt fragments for text-to-text models.
// Task-specific templates live next to the code that fills them.

/// Instruction fragment asking the model for the summary/bullets JSON object.
pub const JSON_OUTPUT_INSTRUCTION: &str = "Output JSON with keys 'summary' (string) \
    and 'bullets' (array of strings). Do not include any extra commentary.";

/// Trailing cue that primes an encoder-decoder model to answer with JSON.
pub const JSON_CUE: &str = "JSON:";
