//! Token-count heuristic and transcript auto-compression.

use agent_core::{Message, Role};

/// Preserve the system message plus the last this-many messages when
/// compressing; the rest collapses into one summary line.
const COMPRESSION_TAIL: usize = 6;
const COMPRESSION_THRESHOLD: f64 = 0.8;

/// Estimate a message's token count: CJK characters weigh 1.5, ASCII word
/// characters weigh 1.3 per word, everything else 0.5 per character.
pub fn estimate_tokens(text: &str) -> f64 {
    let mut total = 0.0;
    let mut word_chars = 0usize;

    let flush_word = |word_chars: &mut usize, total: &mut f64| {
        if *word_chars > 0 {
            *total += 1.3;
            *word_chars = 0;
        }
    };

    for c in text.chars() {
        if is_cjk(c) {
            flush_word(&mut word_chars, &mut total);
            total += 1.5;
        } else if c.is_alphanumeric() {
            word_chars += 1;
        } else {
            flush_word(&mut word_chars, &mut total);
            if !c.is_whitespace() {
                total += 0.5;
            }
        }
    }
    flush_word(&mut word_chars, &mut total);
    total
}

fn is_cjk(c: char) -> bool {
    let cp = c as u32;
    (0x4E00..=0x9FFF).contains(&cp)
        || (0x3040..=0x30FF).contains(&cp)
        || (0xAC00..=0xD7A3).contains(&cp)
}

/// Sum the estimate across a whole transcript, rounded up.
pub fn estimate_transcript_tokens(messages: &[Message]) -> u64 {
    messages
        .iter()
        .map(|m| estimate_tokens(&m.content))
        .sum::<f64>()
        .ceil() as u64
}

/// True if the transcript has crossed the auto-compression threshold for a
/// model with the given context window.
pub fn should_compress(messages: &[Message], context_window: u64) -> bool {
    if context_window == 0 {
        return false;
    }
    let used = estimate_transcript_tokens(messages);
    (used as f64) >= COMPRESSION_THRESHOLD * (context_window as f64)
}

/// Rewrite `messages` to `[system, summary, ...last COMPRESSION_TAIL]`. The
/// first message (assumed `system`) is preserved verbatim. A no-op if there
/// are already few enough messages that nothing would be dropped.
pub fn compress_transcript(messages: &[Message]) -> Vec<Message> {
    if messages.len() <= COMPRESSION_TAIL + 2 {
        return messages.to_vec();
    }
    let system = messages[0].clone();
    let tail_start = messages.len() - COMPRESSION_TAIL;
    let dropped = tail_start - 1;

    let mut out = Vec::with_capacity(COMPRESSION_TAIL + 2);
    out.push(system);
    out.push(Message::system(format!("[history compressed: {dropped} messages]")));
    out.extend_from_slice(&messages[tail_start..]);
    out
}
