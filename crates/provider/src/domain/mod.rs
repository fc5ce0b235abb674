//! Forum-shaped value objects projected from chat concepts.
//!
//! Channels play the part of topics, lines the part of posts, and nicks the
//! part of users. Operations a chat network cannot express return
//! [`Error::Unsupported`](crate::Error::Unsupported).

mod category;
mod chat;
mod post;
mod private_message;
mod topic;
mod user;

pub use {
    category::Category,
    chat::{Chat, ChatMessage},
    post::Post,
    private_message::PrivateMessage,
    topic::Topic,
    user::User,
};

/// Longest channel name a server is required to accept, prefix included.
pub const MAX_CHANNEL_NAME_LEN: usize = 50;

/// True for names starting with `#`, `&`, `+` or `!` that contain no space,
/// comma or control character and are at most [`MAX_CHANNEL_NAME_LEN`] long.
pub fn is_channel_name(name: &str) -> bool {
    let mut chars = name.chars();
    if !matches!(chars.next(), Some('#' | '&' | '+' | '!')) {
        return false;
    }
    if name.chars().count() > MAX_CHANNEL_NAME_LEN {
        return false;
    }
    chars.all(|c| c != ' ' && c != ',' && !c.is_control())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("#room", true)]
    #[case("&local", true)]
    #[case("+modeless", true)]
    #[case("!safe12345", true)]
    #[case("#", true)]
    #[case("room", false)]
    #[case("", false)]
    #[case("#has space", false)]
    #[case("#a,b", false)]
    #[case("#bell\x07", false)]
    fn channel_names(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_channel_name(name), expected);
    }

    #[test]
    fn channel_name_length_limit() {
        let fits = format!("#{}", "a".repeat(MAX_CHANNEL_NAME_LEN - 1));
        let too_long = format!("#{}", "a".repeat(MAX_CHANNEL_NAME_LEN));
        assert!(is_channel_name(&fits));
        assert!(!is_channel_name(&too_long));
    }
}
