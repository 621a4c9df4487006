use gtk4::prelude::*;
use gtk4::{Box, Image, Label, ListBox, ListBoxRow, Orientation, SelectionMode};
use nexus::shell::Mode;

/// Navigation list with one row per mode, in `Mode::ALL` order.
pub fn create_mode_list(active: Mode) -> ListBox {
    let list = ListBox::new();
    list.set_selection_mode(SelectionMode::Single);
    list.add_css_class("navigation-sidebar");

    for mode in Mode::ALL {
        let row = ListBoxRow::new();
        row.set_widget_name(mode.id());

        let content = Box::new(Orientation::Horizontal, 12);
        content.set_margin_start(6);
        content.set_margin_end(6);
        content.set_margin_top(6);
        content.set_margin_bottom(6);
        content.append(&Image::from_icon_name(mode.icon_name()));
        let label = Label::new(Some(mode.label()));
        label.set_xalign(0.0);
        content.append(&label);

        row.set_child(Some(&content));
        list.append(&row);
        if mode == active {
            list.select_row(Some(&row));
        }
    }

    list
}

/// The mode behind a navigation row.
pub fn mode_for_row(row: &ListBoxRow) -> Option<Mode> {
    usize::try_from(row.index())
        .ok()
        .and_then(|i| Mode::ALL.get(i).copied())
}
