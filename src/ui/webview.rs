use gtk4::prelude::*;
use gtk4::ScrolledWindow;
use nexus::render::{render_answer_page, render_blank_page, render_error_page};
use nexus::responder::ResponderState;
use webkit6::prelude::*;
use webkit6::{NavigationPolicyDecision, PolicyDecisionType, WebView};

/// Creates the web view that displays prompt pane answers.
///
/// Links open in the default browser instead of replacing the answer.
pub fn create_answer_view() -> (WebView, ScrolledWindow) {
    let web_view = WebView::new();
    if let Some(settings) = webkit6::prelude::WebViewExt::settings(&web_view) {
        settings.set_enable_javascript(false);
        settings.set_enable_developer_extras(false);
    }
    web_view.set_vexpand(true);
    web_view.load_html(&render_blank_page(), None);

    web_view.connect_decide_policy(|_, decision, decision_type| {
        if decision_type != PolicyDecisionType::NavigationAction {
            return false;
        }
        let Some(navigation) = decision.downcast_ref::<NavigationPolicyDecision>() else {
            return false;
        };
        let uri = navigation
            .navigation_action()
            .and_then(|mut action| action.request())
            .and_then(|request| request.uri());
        match uri {
            Some(uri) if uri.starts_with("http://") || uri.starts_with("https://") => {
                tracing::info!("Opening source link {}", uri);
                gtk4::UriLauncher::new(&uri).launch(
                    None::<&gtk4::Window>,
                    None::<&gio::Cancellable>,
                    |res| {
                        if let Err(e) = res {
                            tracing::warn!("Failed to open link: {}", e);
                        }
                    },
                );
                decision.ignore();
                true
            }
            _ => false,
        }
    });

    let scroll = ScrolledWindow::builder()
        .child(&web_view)
        .hexpand(true)
        .vexpand(true)
        .build();
    (web_view, scroll)
}

/// Shows the outcome of a prompt pane. `Submitting` blanks the page.
pub fn show_responder_state(web_view: &WebView, state: &ResponderState) {
    let html = match state {
        ResponderState::Idle | ResponderState::Submitting => render_blank_page(),
        ResponderState::Success(answer) => render_answer_page(answer),
        ResponderState::Error(message) => render_error_page(message),
    };
    web_view.load_html(&html, None);
}
