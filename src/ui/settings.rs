use crate::state::AppState;
use adw::prelude::*;
use adw::{ActionRow, PreferencesGroup, PreferencesPage, PreferencesWindow};
use gtk4::{glib, Entry, PasswordEntry, SpinButton};
use nexus::config::AppConfig;
use std::cell::RefCell;
use std::rc::Rc;

fn entry_row(group: &PreferencesGroup, title: &str, subtitle: &str, value: &str) -> Entry {
    let row = ActionRow::builder().title(title).subtitle(subtitle).build();
    let entry = Entry::builder()
        .valign(gtk4::Align::Center)
        .hexpand(true)
        .text(value)
        .build();
    row.add_suffix(&entry);
    group.add(&row);
    entry
}

fn text_or_default(entry: &Entry, default: &str) -> String {
    let text = entry.text().trim().to_string();
    if text.is_empty() {
        default.to_string()
    } else {
        text
    }
}

/// Opens the preferences window. The edited configuration is saved and
/// applied when the window closes.
pub fn show_settings(
    parent: &gtk4::Window,
    state: Rc<RefCell<AppState>>,
    on_config_changed: Option<Rc<dyn Fn()>>,
) {
    let window = PreferencesWindow::builder()
        .transient_for(parent)
        .modal(true)
        .title("Ayarlar")
        .default_width(560)
        .build();

    let config = state.borrow().config.clone();
    let defaults = AppConfig::default();

    let page = PreferencesPage::new();
    page.set_title("Gemini");
    page.set_icon_name(Some("starred-symbolic"));
    window.add(&page);

    let connection_group = PreferencesGroup::new();
    connection_group.set_title("Bağlantı");
    connection_group.set_description(Some(
        "GEMINI_API_KEY veya API_KEY ortam değişkeni tanımlıysa buradaki anahtarın yerine kullanılır.",
    ));
    page.add(&connection_group);

    let api_key_row = ActionRow::builder()
        .title("API Anahtarı")
        .subtitle("Gemini API anahtarınız (gizli)")
        .build();
    let api_key_entry = PasswordEntry::builder()
        .valign(gtk4::Align::Center)
        .hexpand(true)
        .show_peek_icon(true)
        .build();
    api_key_entry.set_text(config.api_key.as_deref().unwrap_or(""));
    api_key_row.add_suffix(&api_key_entry);
    connection_group.add(&api_key_row);

    let url_entry = entry_row(
        &connection_group,
        "Temel URL",
        "Gemini REST uç noktası",
        &config.base_url,
    );

    let timeout_row = ActionRow::builder()
        .title("İstek Zaman Aşımı")
        .subtitle("Saniye cinsinden; 0 zaman aşımı yok demektir")
        .build();
    let timeout_spin = SpinButton::with_range(0.0, 600.0, 5.0);
    timeout_spin.set_valign(gtk4::Align::Center);
    timeout_spin.set_value(config.request_timeout_secs.unwrap_or(0) as f64);
    timeout_row.add_suffix(&timeout_spin);
    connection_group.add(&timeout_row);

    let model_group = PreferencesGroup::new();
    model_group.set_title("Modeller");
    page.add(&model_group);

    let chat_entry = entry_row(&model_group, "Sohbet", "Akışlı sohbet modeli", &config.chat_model);
    let complex_entry = entry_row(
        &model_group,
        "Düşünme Modu",
        "Maksimum düşünme bütçesiyle çalışan model",
        &config.complex_model,
    );
    let fast_entry = entry_row(
        &model_group,
        "Hızlı Yanıtlar",
        "Düşük gecikmeli model",
        &config.fast_model,
    );
    let grounded_entry = entry_row(
        &model_group,
        "Arama Temelli",
        "Google Arama ile temellendirilen model",
        &config.grounded_model,
    );
    let image_entry = entry_row(
        &model_group,
        "Görsel Düzenleyici",
        "Görsel çıktı üretebilen model",
        &config.image_model,
    );

    let behavior_group = PreferencesGroup::new();
    behavior_group.set_title("Davranış");
    page.add(&behavior_group);

    let instruction_entry = entry_row(
        &behavior_group,
        "Sistem Talimatı",
        "Sohbet asistanının kişiliği",
        &config.system_instruction,
    );

    window.connect_close_request(glib::clone!(
        #[strong]
        state,
        #[strong]
        api_key_entry,
        #[strong]
        url_entry,
        #[strong]
        timeout_spin,
        #[strong]
        chat_entry,
        #[strong]
        complex_entry,
        #[strong]
        fast_entry,
        #[strong]
        grounded_entry,
        #[strong]
        image_entry,
        #[strong]
        instruction_entry,
        #[strong]
        on_config_changed,
        move |_| {
            let mut updated = state.borrow().config.clone();
            let key = api_key_entry.text().trim().to_string();
            updated.api_key = if key.is_empty() { None } else { Some(key) };
            updated.base_url = text_or_default(&url_entry, &defaults.base_url);
            let timeout = timeout_spin.value_as_int().max(0) as u64;
            updated.request_timeout_secs = if timeout == 0 { None } else { Some(timeout) };
            updated.chat_model = text_or_default(&chat_entry, &defaults.chat_model);
            updated.complex_model = text_or_default(&complex_entry, &defaults.complex_model);
            updated.fast_model = text_or_default(&fast_entry, &defaults.fast_model);
            updated.grounded_model = text_or_default(&grounded_entry, &defaults.grounded_model);
            updated.image_model = text_or_default(&image_entry, &defaults.image_model);
            updated.system_instruction = instruction_entry.text().trim().to_string();

            if updated == state.borrow().config {
                return glib::Propagation::Proceed;
            }

            if let Err(e) = updated.save() {
                tracing::error!("Failed to save settings: {}", e);
            }
            state.borrow_mut().apply_config(updated);

            if let Some(on_changed) = &on_config_changed {
                on_changed();
            }

            glib::Propagation::Proceed
        }
    ));

    window.present();
}
