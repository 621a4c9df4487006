use adw::{HeaderBar, WindowTitle};
use gtk4::prelude::WidgetExt;
use gtk4::{Button, ToggleButton};
use nexus::constants::APP_NAME;

/// Creates the header bar with the sidebar toggle, chat reset and settings buttons.
pub fn create_header_bar() -> (HeaderBar, WindowTitle, Button, Button, ToggleButton) {
    let header_bar = HeaderBar::new();
    let view_title = WindowTitle::new(APP_NAME, "");
    header_bar.set_title_widget(Some(&view_title));

    let sidebar_toggle = ToggleButton::builder()
        .icon_name("sidebar-show-symbolic")
        .tooltip_text("Kenar Çubuğunu Göster/Gizle")
        .active(true)
        .build();
    header_bar.pack_start(&sidebar_toggle);

    let settings_btn = Button::builder()
        .icon_name("emblem-system-symbolic")
        .tooltip_text("Ayarlar")
        .build();

    let clear_chat_btn = Button::builder()
        .icon_name("user-trash-symbolic")
        .tooltip_text("Sohbeti Temizle")
        .visible(false)
        .build();
    clear_chat_btn.add_css_class("destructive-action");

    header_bar.pack_end(&settings_btn);
    header_bar.pack_end(&clear_chat_btn);

    (
        header_bar,
        view_title,
        clear_chat_btn,
        settings_btn,
        sidebar_toggle,
    )
}
