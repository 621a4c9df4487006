use gtk4::prelude::*;
use gtk4::{Align, Box, Button, Entry, Label, Orientation, PolicyType, ScrolledWindow, Spinner};
use html_escape::encode_text;
use nexus::api::{Role, Turn};
use nexus::chat::ChatController;
use nexus::render::markdown_to_pango;
use std::rc::Rc;

/// Widgets of the chat pane.
#[derive(Clone)]
pub struct ChatPane {
    pub root: Box,
    messages: Box,
    scroller: ScrolledWindow,
    placeholder: adw::StatusPage,
    entry: Entry,
    send_btn: Button,
    spinner: Spinner,
}

impl ChatPane {
    /// Redraws every bubble from the controller's history.
    pub fn refresh(&self, controller: &ChatController) {
        let history = controller.history().borrow();
        show_turns(&self.messages, &self.scroller, &self.placeholder, history.turns());
        set_busy(&self.entry, &self.send_btn, &self.spinner, history.is_loading());
    }
}

pub fn create_chat_pane(controller: Rc<ChatController>) -> ChatPane {
    let root = Box::new(Orientation::Vertical, 0);

    let placeholder = adw::StatusPage::builder()
        .icon_name("user-available-symbolic")
        .title("Nexus ile Sohbet")
        .description("Herhangi bir şey sorun. Konuşmanız bu cihazda saklanır.")
        .vexpand(true)
        .build();

    let messages = Box::new(Orientation::Vertical, 8);
    messages.set_margin_start(16);
    messages.set_margin_end(16);
    messages.set_margin_top(12);
    messages.set_margin_bottom(12);

    let scroller = ScrolledWindow::builder()
        .hscrollbar_policy(PolicyType::Never)
        .vscrollbar_policy(PolicyType::Automatic)
        .child(&messages)
        .vexpand(true)
        .build();

    // Keep the newest fragment in view.
    let adj = scroller.vadjustment();
    adj.connect_changed(move |a| {
        a.set_value(a.upper() - a.page_size());
    });

    let input_box = Box::new(Orientation::Horizontal, 6);
    input_box.set_margin_start(12);
    input_box.set_margin_end(12);
    input_box.set_margin_top(6);
    input_box.set_margin_bottom(12);

    let entry = Entry::builder()
        .placeholder_text("Nexus'a bir mesaj yazın...")
        .hexpand(true)
        .build();
    let spinner = Spinner::new();
    let send_btn = Button::builder()
        .icon_name("mail-send-symbolic")
        .tooltip_text("Gönder")
        .sensitive(false)
        .build();
    send_btn.add_css_class("suggested-action");

    input_box.append(&entry);
    input_box.append(&spinner);
    input_box.append(&send_btn);

    root.append(&placeholder);
    root.append(&scroller);
    root.append(&input_box);

    let pane = ChatPane {
        root,
        messages,
        scroller,
        placeholder,
        entry,
        send_btn,
        spinner,
    };
    pane.refresh(&controller);

    pane.entry.connect_changed(glib::clone!(
        #[weak(rename_to = send_btn)]
        pane.send_btn,
        #[strong]
        controller,
        move |entry| {
            send_btn.set_sensitive(!controller.is_loading() && !entry.text().trim().is_empty());
        }
    ));

    let send = Rc::new(glib::clone!(
        #[weak(rename_to = entry)]
        pane.entry,
        #[weak(rename_to = send_btn)]
        pane.send_btn,
        #[weak(rename_to = spinner)]
        pane.spinner,
        #[weak(rename_to = messages)]
        pane.messages,
        #[weak(rename_to = scroller)]
        pane.scroller,
        #[weak(rename_to = placeholder)]
        pane.placeholder,
        #[strong]
        controller,
        move || {
            let text = entry.text().to_string();
            if text.trim().is_empty() || controller.is_loading() {
                return;
            }
            entry.set_text("");
            set_busy(&entry, &send_btn, &spinner, true);

            glib::MainContext::default().spawn_local(glib::clone!(
                #[strong]
                controller,
                #[strong]
                entry,
                #[strong]
                send_btn,
                #[strong]
                spinner,
                #[strong]
                messages,
                #[strong]
                scroller,
                #[strong]
                placeholder,
                async move {
                    let outcome = controller
                        .send(&text, |turns| {
                            show_turns(&messages, &scroller, &placeholder, turns)
                        })
                        .await;
                    if let Err(e) = outcome {
                        tracing::debug!("Chat input rejected: {}", e);
                    }
                    set_busy(&entry, &send_btn, &spinner, false);
                    entry.grab_focus();
                }
            ));
        }
    ));

    pane.entry.connect_activate(glib::clone!(
        #[strong]
        send,
        move |_| send()
    ));
    pane.send_btn.connect_clicked(glib::clone!(
        #[strong]
        send,
        move |_| send()
    ));

    pane
}

fn set_busy(entry: &Entry, send_btn: &Button, spinner: &Spinner, busy: bool) {
    entry.set_sensitive(!busy);
    send_btn.set_sensitive(!busy && !entry.text().trim().is_empty());
    if busy {
        spinner.start();
    } else {
        spinner.stop();
    }
}

fn turn_markup(turn: &Turn) -> String {
    match turn.role {
        Role::User => encode_text(&turn.text).to_string(),
        Role::Model => markdown_to_pango(&turn.text),
    }
}

fn style_bubble(label: &Label, role: Role) {
    label.remove_css_class("user-message");
    label.remove_css_class("model-message");
    match role {
        Role::User => {
            label.set_halign(Align::End);
            label.add_css_class("user-message");
        }
        Role::Model => {
            label.set_halign(Align::Start);
            label.add_css_class("model-message");
        }
    }
}

fn create_bubble(turn: &Turn, markup: &str) -> Label {
    let label = Label::builder()
        .wrap(true)
        .wrap_mode(gtk4::pango::WrapMode::WordChar)
        .selectable(true)
        .xalign(0.0)
        .max_width_chars(72)
        .use_markup(true)
        .build();
    label.set_markup(markup);
    label.add_css_class("card");
    label.set_margin_start(4);
    label.set_margin_end(4);
    style_bubble(&label, turn.role);
    label
}

/// Brings the bubble list in line with `turns`, touching only what changed.
fn show_turns(
    messages: &Box,
    scroller: &ScrolledWindow,
    placeholder: &adw::StatusPage,
    turns: &[Turn],
) {
    placeholder.set_visible(turns.is_empty());
    scroller.set_visible(!turns.is_empty());

    let mut child = messages.first_child();
    for turn in turns {
        let markup = turn_markup(turn);
        match child.take() {
            Some(widget) => {
                child = widget.next_sibling();
                if let Ok(label) = widget.downcast::<Label>() {
                    if label.label().as_str() != markup {
                        label.set_markup(&markup);
                    }
                    style_bubble(&label, turn.role);
                }
            }
            None => messages.append(&create_bubble(turn, &markup)),
        }
    }
    while let Some(widget) = child {
        child = widget.next_sibling();
        messages.remove(&widget);
    }
}
