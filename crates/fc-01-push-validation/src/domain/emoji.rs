//! Reaction short-codes accepted on posts.

use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    static ref SHORT_CODES: HashSet<&'static str> = [
        "+1", "-1", "thumbsup", "thumbsdown", "smile", "smiley", "grinning", "laughing",
        "joy", "rofl", "wink", "blush", "heart", "heart_eyes", "broken_heart", "tada",
        "confused", "cry", "sob", "angry", "rage", "scream", "thinking", "rocket", "eyes",
        "fire", "100", "clap", "pray", "ok_hand", "wave", "muscle", "raised_hands",
        "point_up", "star", "sparkles", "zap", "boom", "bug", "warning", "white_check_mark",
        "x", "question", "exclamation", "bulb", "lock", "unlock", "key", "hammer", "wrench",
        "gear", "memo", "book", "package", "construction", "hourglass", "sunglasses",
        "sweat_smile", "neutral_face", "expressionless", "unamused", "disappointed",
        "relieved", "sleeping", "skull", "ghost", "robot", "coffee", "beer", "cake",
        "trophy", "medal", "gem", "moneybag", "checkered_flag", "triangular_flag_on_post",
    ]
    .into_iter()
    .collect();
}

/// Whether `code` is a known short-code, with or without surrounding colons.
pub fn is_known_emoji(code: &str) -> bool {
    let bare = code
        .strip_prefix(':')
        .and_then(|c| c.strip_suffix(':'))
        .unwrap_or(code);
    SHORT_CODES.contains(bare)
}
