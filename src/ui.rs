use crate::views::{ChatView, UploadView};
use dioxus::prelude::*;

const MAIN_CSS: Asset = asset!("/assets/main.css");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AppTab {
    Upload,
    Chat,
}

#[component]
pub fn App() -> Element {
    let active_tab = use_signal(|| AppTab::Upload);

    rsx! {
        document::Link { rel: "stylesheet", href: MAIN_CSS }
        AppHeader { active_tab }
        TabPanels { active_tab }
    }
}

#[component]
fn AppHeader(active_tab: Signal<AppTab>) -> Element {
    rsx! {
        div { class: "header",
            div { class: "header-content",
                span { class: "header-wordmark", "Arogyam" }
                TabNavigation { active_tab }
            }
        }
    }
}

#[component]
fn TabPanels(active_tab: Signal<AppTab>) -> Element {
    rsx! {
        div { class: "tab-panels",
            TabPanel {
                active_tab,
                tab: AppTab::Upload,
                children: rsx!( UploadView {} ),
            }
            TabPanel {
                active_tab,
                tab: AppTab::Chat,
                children: rsx!( ChatView {} ),
            }
        }
    }
}

#[component]
fn TabPanel(active_tab: Signal<AppTab>, tab: AppTab, children: Element) -> Element {
    let is_active = active_tab() == tab;
    let class_suffix = if is_active { "active" } else { "" };
    rsx! {
        div {
            class: format_args!("tab-panel {}", class_suffix),
            aria_hidden: (!is_active).to_string(),
            {children}
        }
    }
}

#[component]
fn TabNavigation(active_tab: Signal<AppTab>) -> Element {
    rsx! {
        div { class: "tabs",
            TabButton { active_tab, tab: AppTab::Upload, label: "Upload" }
            TabButton { active_tab, tab: AppTab::Chat, label: "FundFinder" }
        }
    }
}

#[component]
fn TabButton(active_tab: Signal<AppTab>, tab: AppTab, label: &'static str) -> Element {
    let mut active_tab = active_tab;
    let class = if active_tab() == tab {
        "tab active"
    } else {
        "tab"
    };
    rsx! {
        h1 {
            class: class,
            onclick: move |_| active_tab.set(tab),
            "{label}"
        }
    }
}
