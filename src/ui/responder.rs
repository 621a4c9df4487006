use crate::state::AppState;
use crate::ui::webview::{create_answer_view, show_responder_state};
use gtk4::prelude::*;
use gtk4::{Box, Button, Entry, Label, Orientation, Spinner};
use nexus::responder::{submit, PromptResponder, ResponderKind, ResponderState};
use std::cell::RefCell;
use std::rc::Rc;

/// Builds one single-prompt pane (thinking, fast or grounded).
pub fn create_responder_pane(kind: ResponderKind, state: Rc<RefCell<AppState>>) -> Box {
    let responder = Rc::new(RefCell::new(PromptResponder::new(kind)));

    let root = Box::new(Orientation::Vertical, 12);
    root.set_margin_start(24);
    root.set_margin_end(24);
    root.set_margin_top(18);
    root.set_margin_bottom(18);

    let title = Label::builder().label(kind.title()).xalign(0.0).build();
    title.add_css_class("title-2");
    let description = Label::builder()
        .label(kind.description())
        .wrap(true)
        .xalign(0.0)
        .build();
    description.add_css_class("dim-label");

    let input_box = Box::new(Orientation::Horizontal, 6);
    let entry = Entry::builder()
        .placeholder_text(kind.placeholder())
        .hexpand(true)
        .build();
    let spinner = Spinner::new();
    let run_btn = Button::builder()
        .label(kind.button_text())
        .sensitive(false)
        .build();
    run_btn.add_css_class("suggested-action");
    input_box.append(&entry);
    input_box.append(&spinner);
    input_box.append(&run_btn);

    let (web_view, answer_scroll) = create_answer_view();
    answer_scroll.add_css_class("card");

    root.append(&title);
    root.append(&description);
    root.append(&input_box);
    root.append(&answer_scroll);

    entry.connect_changed(glib::clone!(
        #[weak]
        run_btn,
        #[strong]
        responder,
        move |entry| {
            let mut pane = responder.borrow_mut();
            pane.set_prompt(entry.text().as_str());
            run_btn.set_sensitive(pane.can_submit());
        }
    ));

    let run = Rc::new(glib::clone!(
        #[weak]
        entry,
        #[weak]
        run_btn,
        #[weak]
        spinner,
        #[weak]
        web_view,
        #[strong]
        responder,
        #[strong]
        state,
        move || {
            if !responder.borrow().can_submit() {
                return;
            }
            let backend = state.borrow().backend();
            entry.set_sensitive(false);
            run_btn.set_sensitive(false);
            spinner.start();

            glib::MainContext::default().spawn_local(glib::clone!(
                #[strong]
                responder,
                #[strong]
                entry,
                #[strong]
                run_btn,
                #[strong]
                spinner,
                #[strong]
                web_view,
                async move {
                    show_responder_state(&web_view, &ResponderState::Submitting);
                    if let Err(e) = submit(&responder, backend.as_ref()).await {
                        tracing::debug!("{:?} submission rejected: {}", kind, e);
                    }
                    show_responder_state(&web_view, responder.borrow().state());
                    spinner.stop();
                    entry.set_sensitive(true);
                    run_btn.set_sensitive(responder.borrow().can_submit());
                }
            ));
        }
    ));

    entry.connect_activate(glib::clone!(
        #[strong]
        run,
        move |_| run()
    ));
    run_btn.connect_clicked(glib::clone!(
        #[strong]
        run,
        move |_| run()
    ));

    root
}
