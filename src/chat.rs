use crate::types::{AuthState, ChatMessage, UserId};

pub const GREETING: &str = "Hello, I am your healthcare assistant. How can I help you today?";
pub const GREETING_REPLY: &str = "Hello! I am here to assist you with your fund request.";
pub const FALLBACK_REPLY: &str =
    "I can help with fund requests. Please let me know if you need to create a new request.";

const GREETING_TOKENS: &[&str] = &["hello", "hi", "hey", "greetings"];

/// Pick the bot reply for a user message.
///
/// Matching is a case-insensitive substring test, so "this" counts as a
/// greeting because it contains "hi".
pub fn classify(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    if GREETING_TOKENS.iter().any(|token| lowered.contains(token)) {
        GREETING_REPLY
    } else {
        FALLBACK_REPLY
    }
}

/// Message log and input buffer of the chat widget
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatFlow {
    state: AuthState,
    messages: Vec<ChatMessage>,
    input: String,
}

impl ChatFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&UserId> {
        self.state.user()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_enabled(&self) -> bool {
        self.state.user().is_some()
    }

    /// Move to the authenticated state and seed the greeting. Only the first
    /// call has any effect.
    pub fn on_authenticated(&mut self, user: UserId) -> bool {
        if self.state.user().is_some() {
            return false;
        }
        tracing::debug!(user = %user, "chat session started");
        self.state = AuthState::Authenticated(user);
        self.messages = vec![ChatMessage::bot(GREETING)];
        true
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Submit whatever is in the input buffer
    pub fn submit(&mut self) -> bool {
        let text = std::mem::take(&mut self.input);
        let appended = self.submit_message(&text);
        if !appended {
            self.input = text;
        }
        appended
    }

    /// Append the user message and the bot reply.
    ///
    /// Blank text and submissions before sign in leave the log untouched.
    /// The user entry keeps the text as typed; only the emptiness check
    /// trims it.
    pub fn submit_message(&mut self, text: &str) -> bool {
        if !self.input_enabled() || text.trim().is_empty() {
            return false;
        }

        self.messages.push(ChatMessage::user(text));
        self.messages.push(ChatMessage::bot(classify(text)));
        self.input.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sender;

    fn signed_in() -> ChatFlow {
        let mut flow = ChatFlow::new();
        flow.on_authenticated(UserId::new("u1"));
        flow
    }

    #[test]
    fn test_classify_greetings() {
        assert_eq!(classify("hi!"), GREETING_REPLY);
        assert_eq!(classify("Greetings, friend"), GREETING_REPLY);
        assert_eq!(classify("HEY"), GREETING_REPLY);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("HELLO there"), classify("hello there"));
    }

    #[test]
    fn test_classify_fallback() {
        assert_eq!(classify("I need funds"), FALLBACK_REPLY);
        assert_eq!(classify(""), FALLBACK_REPLY);
    }

    #[test]
    fn test_classify_matches_substrings() {
        assert_eq!(classify("this"), GREETING_REPLY);
        assert_eq!(classify("they"), GREETING_REPLY);
    }

    #[test]
    fn test_unauthenticated_flow_is_empty_and_disabled() {
        let mut flow = ChatFlow::new();
        assert!(flow.messages().is_empty());
        assert!(!flow.input_enabled());
        assert!(!flow.submit_message("hello"));
        assert!(flow.messages().is_empty());
    }

    #[test]
    fn test_authentication_seeds_single_greeting() {
        let mut flow = signed_in();
        assert_eq!(flow.messages().len(), 1);
        assert_eq!(flow.messages()[0].sender, Sender::Bot);
        assert_eq!(flow.messages()[0].text, GREETING);

        assert!(!flow.on_authenticated(UserId::new("u2")));
        assert_eq!(flow.user(), Some(&UserId::new("u1")));
        assert_eq!(flow.messages().len(), 1);
    }

    #[test]
    fn test_submit_keeps_raw_text() {
        let mut flow = signed_in();
        assert!(flow.submit_message("  need money  "));
        assert_eq!(flow.messages()[1].text, "  need money  ");
        assert_eq!(flow.messages()[2].text, FALLBACK_REPLY);
    }

    #[test]
    fn test_submit_clears_input_buffer() {
        let mut flow = signed_in();
        flow.set_input("hey");
        assert!(flow.submit());
        assert_eq!(flow.input(), "");
        assert_eq!(flow.messages().len(), 3);
    }

    #[test]
    fn test_blank_submit_keeps_input_buffer() {
        let mut flow = signed_in();
        flow.set_input("   ");
        assert!(!flow.submit());
        assert_eq!(flow.input(), "   ");
        assert_eq!(flow.messages().len(), 1);
    }
}
