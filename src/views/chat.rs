use crate::backend::Backend;
use crate::chat::ChatFlow;
use crate::types::{ChatMessage, Sender};
use dioxus::prelude::*;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

fn format_message_timestamp(timestamp: Option<OffsetDateTime>) -> Option<String> {
    let mut datetime = timestamp?;
    if let Ok(offset) = UtcOffset::current_local_offset() {
        datetime = datetime.to_offset(offset);
    }
    datetime.format(MESSAGE_TIME_FORMAT).ok()
}

fn sender_class(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "user",
        Sender::Bot => "bot",
    }
}

/// Listen for the sign-in transition, then kick off the sign in itself.
fn use_chat_session(mut flow: Signal<ChatFlow>, mut sign_in_failed: Signal<bool>) {
    let backend = use_context::<Backend>();
    use_hook(move || {
        let session = backend.session.clone();
        let mut subscription = session.subscribe();
        let listener_session = session.clone();
        spawn(async move {
            let mut state = subscription.current();
            while state.user().is_none() {
                match subscription.changed().await {
                    Some(next) => state = next,
                    None => break,
                }
            }
            if let Some(user) = state.user() {
                flow.with_mut(|chat| chat.on_authenticated(user.clone()));
            }
            // Sign out is not modelled, nothing more to hear.
            listener_session.unsubscribe(subscription);
        });

        spawn(async move {
            if session.sign_in().await.is_err() {
                sign_in_failed.set(true);
            }
        });
    });
}

#[component]
pub fn ChatView() -> Element {
    let mut flow = use_signal(ChatFlow::new);
    let sign_in_failed = use_signal(|| false);
    use_chat_session(flow, sign_in_failed);

    let chat = flow.read();
    if !chat.input_enabled() {
        return rsx! {
            div { class: "main-container loading",
                if sign_in_failed() {
                    span { class: "text-muted", "Unable to sign in. Please reload and try again." }
                } else {
                    div { class: "spinner" }
                    span { class: "loading-label", "Loading application..." }
                }
            }
        };
    }

    let user_label = chat.user().map(|user| user.to_string()).unwrap_or_default();
    let messages: Vec<ChatMessage> = chat.messages().to_vec();
    let input_value = chat.input().to_string();
    drop(chat);

    rsx! {
        div { class: "main-container",
            div { class: "chat-header",
                h2 { class: "section-title", "FundFinder" }
                span { class: "user-id", "ID: {user_label}" }
            }
            div { class: "chat-wrap",
                div { id: "chat-list", class: "chat-list",
                    for (i, msg) in messages.iter().enumerate() {
                        div { key: "{i}", class: format_args!("message-row {}", sender_class(msg.sender)),
                            div { class: "message-stack",
                                div { class: format_args!("bubble {}", sender_class(msg.sender)), "{msg.text}" }
                                if let Some(ts) = format_message_timestamp(msg.created_at) {
                                    div { class: format_args!(
                                            "message-meta {}",
                                            match msg.sender { Sender::User => "align-end", Sender::Bot => "align-start" }
                                        ),
                                        span { class: "message-timestamp", "{ts}" }
                                    }
                                }
                            }
                        }
                    }
                }
            }

            form { class: "composer",
                onsubmit: move |ev: FormEvent| {
                    ev.prevent_default();
                    flow.with_mut(|chat| chat.submit());
                },
                div { class: "composer-inner hstack",
                    input {
                        r#type: "text",
                        placeholder: "Type your message...",
                        value: "{input_value}",
                        oninput: move |ev| flow.with_mut(|chat| chat.set_input(ev.value())),
                    }
                    button { class: "btn btn-primary", r#type: "submit", "Send" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_missing_timestamp_renders_nothing() {
        assert_eq!(format_message_timestamp(None), None);
    }

    #[test]
    fn test_timestamp_uses_twelve_hour_clock() {
        let formatted = format_message_timestamp(Some(datetime!(2024-05-01 13:05 UTC))).unwrap();
        assert!(formatted.ends_with("AM") || formatted.ends_with("PM"));
        assert_eq!(formatted.len(), "01:05 PM".len());
    }

    #[test]
    fn test_sender_class() {
        assert_eq!(sender_class(Sender::User), "user");
        assert_eq!(sender_class(Sender::Bot), "bot");
    }
}
