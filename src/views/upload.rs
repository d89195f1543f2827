use crate::backend::Backend;
use crate::types::{SelectedFile, UploadStatus};
use crate::upload::UploadFlow;
use dioxus::prelude::*;
use std::path::Path;

/// Desktop file engines report full paths; storage keys only want the name.
fn display_name(raw: &str) -> String {
    Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(raw)
        .to_string()
}

fn status_class(status: &UploadStatus) -> &'static str {
    match status {
        UploadStatus::Success(_) => "upload-status success",
        UploadStatus::Failure | UploadStatus::NoFileSelected => "upload-status error",
        UploadStatus::Idle | UploadStatus::Uploading => "upload-status",
    }
}

#[component]
pub fn UploadView() -> Element {
    let backend = use_context::<Backend>();
    let mut flow = use_signal(|| UploadFlow::new(&backend));

    let on_file_change = move |evt: FormEvent| async move {
        let Some(engine) = evt.files() else {
            return;
        };
        let Some(raw_name) = engine.files().into_iter().next() else {
            flow.with_mut(|upload| upload.clear_selection());
            return;
        };
        match engine.read_file(&raw_name).await {
            Some(bytes) => {
                let file = SelectedFile::new(display_name(&raw_name), bytes);
                flow.with_mut(|upload| upload.select_file(file));
            }
            None => tracing::warn!(file = %raw_name, "could not read selected file"),
        }
    };

    let on_upload = move |_| {
        let job = flow.with_mut(|upload| upload.begin_upload());
        if let Some(job) = job {
            spawn(async move {
                let status = job.run().await;
                flow.with_mut(|upload| upload.finish(status));
            });
        }
    };

    let status = flow.read().status().clone();

    rsx! {
        div { class: "main-container",
            div { class: "upload-card",
                h2 { class: "section-title", "Upload Report" }
                label { class: "field-label", r#for: "file-input", "Select your document:" }
                input {
                    id: "file-input",
                    r#type: "file",
                    onchange: on_file_change,
                }
                button {
                    id: "upload-btn",
                    class: "btn btn-primary",
                    r#type: "button",
                    onclick: on_upload,
                    "Upload Document"
                }
                div { id: "upload-status", class: status_class(&status),
                    "{status.message()}"
                    if let Some(url) = status.url() {
                        br {}
                        a { href: "{url}", target: "_blank", class: "upload-link", "{url}" }
                        if CLIPBOARD_AVAILABLE {
                            CopyLinkButton { url: url.to_string() }
                        }
                    }
                }
            }
        }
    }
}

/// Only native shells can reach a system clipboard.
const CLIPBOARD_AVAILABLE: bool = cfg!(all(
    any(feature = "desktop", feature = "mobile"),
    not(target_arch = "wasm32")
));

#[cfg(all(any(feature = "desktop", feature = "mobile"), not(target_arch = "wasm32")))]
fn copy_to_clipboard(text: String) {
    let result = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text));
    if let Err(err) = result {
        tracing::warn!(error = %err, "could not copy link");
    }
}

#[cfg(not(all(any(feature = "desktop", feature = "mobile"), not(target_arch = "wasm32"))))]
fn copy_to_clipboard(_text: String) {}

#[component]
fn CopyLinkButton(url: String) -> Element {
    let on_copy = move |_| copy_to_clipboard(url.clone());

    rsx! {
        button { class: "action-btn", title: "Copy link", onclick: on_copy, "Copy link" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_directories() {
        assert_eq!(display_name("/home/me/report.pdf"), "report.pdf");
        assert_eq!(display_name("report.pdf"), "report.pdf");
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(&UploadStatus::Failure), "upload-status error");
        assert_eq!(
            status_class(&UploadStatus::Success("u".to_string())),
            "upload-status success"
        );
        assert_eq!(status_class(&UploadStatus::Uploading), "upload-status");
    }

    #[cfg(not(any(feature = "desktop", feature = "mobile")))]
    #[test]
    fn test_web_build_hides_copy_link() {
        assert!(!CLIPBOARD_AVAILABLE);
    }
}
