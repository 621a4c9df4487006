mod state;
mod ui;

use adw::prelude::*;
use adw::{Application, ApplicationWindow};
use gtk4::{glib, Orientation};
use nexus::config::AppConfig;
use nexus::constants::{
    APP_ID, APP_NAME, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, MISSING_API_KEY_MESSAGE,
};
use nexus::shell::Mode;
use nexus::storage::{FileStore, SharedStore};
use state::AppState;
use std::cell::RefCell;
use std::rc::Rc;

const APP_CSS: &str = "
    .user-message { padding: 8px 12px; background-color: alpha(@accent_bg_color, 0.15); }
    .model-message { padding: 8px 12px; }
";

#[tokio::main]
async fn main() -> glib::ExitCode {
    // WebKit's sandbox fails to start in some containers and WSL setups.
    std::env::set_var("WEBKIT_DISABLE_SANDBOX_THIS_IS_DANGEROUS", "1");

    tracing_subscriber::fmt::init();

    let app = Application::builder().application_id(APP_ID).build();
    app.connect_startup(|_| load_css());
    app.connect_activate(build_ui);

    app.run()
}

fn load_css() {
    let provider = gtk4::CssProvider::new();
    provider.load_from_string(APP_CSS);
    match gtk4::gdk::Display::default() {
        Some(display) => gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => tracing::warn!("No display available for application styles"),
    }
}

fn build_ui(app: &Application) {
    let config = AppConfig::load();
    let store: SharedStore = Rc::new(FileStore::open_default());
    let state = Rc::new(RefCell::new(AppState::new(config, store)));
    let active = state.borrow().shell.active();

    let window = ApplicationWindow::builder()
        .application(app)
        .default_width(DEFAULT_WINDOW_WIDTH)
        .default_height(DEFAULT_WINDOW_HEIGHT)
        .title(APP_NAME)
        .build();

    let toast_overlay = adw::ToastOverlay::new();
    window.set_content(Some(&toast_overlay));

    let content_box = gtk4::Box::new(Orientation::Vertical, 0);
    toast_overlay.set_child(Some(&content_box));

    let (header_bar, view_title, clear_chat_btn, settings_btn, sidebar_toggle) =
        ui::header::create_header_bar();
    content_box.append(&header_bar);

    let (paned, sidebar_container, mode_list, stack) = ui::layout::create_main_layout(active);
    content_box.append(&paned);

    // Panes
    let chat_controller = state.borrow().chat.clone();
    let chat_pane = ui::chat::create_chat_pane(chat_controller.clone());
    stack.add_named(&chat_pane.root, Some(Mode::Chat.id()));

    for mode in Mode::ALL {
        if let Some(kind) = mode.responder_kind() {
            let pane = ui::responder::create_responder_pane(kind, state.clone());
            stack.add_named(&pane, Some(mode.id()));
        }
    }

    let image_pane =
        ui::image_editor::create_image_editor_pane(&window, &toast_overlay, state.clone());
    stack.add_named(&image_pane.root, Some(Mode::ImageEdit.id()));

    let show_mode = Rc::new(glib::clone!(
        #[weak]
        stack,
        #[weak]
        view_title,
        #[weak]
        clear_chat_btn,
        move |mode: Mode| {
            stack.set_visible_child_name(mode.id());
            view_title.set_subtitle(mode.label());
            clear_chat_btn.set_visible(mode == Mode::Chat);
        }
    ));
    show_mode(active);

    // Navigation
    mode_list.connect_row_selected(glib::clone!(
        #[strong]
        state,
        #[strong]
        show_mode,
        move |_, row| {
            let Some(mode) = row.and_then(ui::sidebar::mode_for_row) else {
                return;
            };
            if state.borrow_mut().shell.select(mode) {
                show_mode(mode);
            }
        }
    ));

    sidebar_toggle.connect_toggled(glib::clone!(
        #[weak]
        sidebar_container,
        move |btn| {
            sidebar_container.set_visible(btn.is_active());
        }
    ));

    clear_chat_btn.connect_clicked(glib::clone!(
        #[strong]
        chat_controller,
        #[strong]
        chat_pane,
        #[weak]
        toast_overlay,
        move |_| {
            if chat_controller.is_loading() {
                toast_overlay
                    .add_toast(adw::Toast::new("Yanıt tamamlanırken sohbet temizlenemez."));
                return;
            }
            chat_controller.clear();
            chat_pane.refresh(&chat_controller);
        }
    ));

    settings_btn.connect_clicked(glib::clone!(
        #[weak]
        window,
        #[strong]
        state,
        #[weak]
        toast_overlay,
        move |_| {
            let on_changed: Rc<dyn Fn()> = Rc::new(glib::clone!(
                #[strong]
                state,
                #[weak]
                toast_overlay,
                move || {
                    let message = if state.borrow().has_api_key() {
                        "Ayarlar kaydedildi."
                    } else {
                        MISSING_API_KEY_MESSAGE
                    };
                    toast_overlay.add_toast(adw::Toast::new(message));
                }
            ));
            ui::settings::show_settings(window.upcast_ref(), state.clone(), Some(on_changed));
        }
    ));

    if !state.borrow().has_api_key() {
        tracing::warn!("No Gemini API key configured");
        toast_overlay.add_toast(adw::Toast::new(MISSING_API_KEY_MESSAGE));
    }

    window.present();
}
