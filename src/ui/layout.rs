use crate::ui::sidebar;
use gtk4::prelude::{BoxExt, WidgetExt};
use gtk4::{Box, Label, ListBox, Orientation, Paned, Stack, StackTransitionType};
use nexus::constants::{APP_NAME, SIDEBAR_WIDTH};
use nexus::shell::Mode;

/// Creates the sidebar/content split. Panes are added to the returned stack
/// under their mode ids.
pub fn create_main_layout(active: Mode) -> (Paned, Box, ListBox, Stack) {
    let paned = Paned::new(Orientation::Horizontal);
    paned.set_hexpand(true);
    paned.set_vexpand(true);
    paned.set_position(SIDEBAR_WIDTH);
    paned.set_shrink_start_child(false);
    paned.set_resize_start_child(false);

    let sidebar_container = Box::new(Orientation::Vertical, 0);
    sidebar_container.add_css_class("sidebar");
    sidebar_container.set_width_request(SIDEBAR_WIDTH);

    let brand = Label::new(Some(APP_NAME));
    brand.add_css_class("title-3");
    brand.set_margin_top(12);
    brand.set_margin_bottom(12);
    sidebar_container.append(&brand);

    let mode_list = sidebar::create_mode_list(active);
    mode_list.set_vexpand(true);
    sidebar_container.append(&mode_list);

    let stack = Stack::new();
    stack.set_transition_type(StackTransitionType::Crossfade);
    stack.set_hexpand(true);
    stack.set_vexpand(true);

    paned.set_start_child(Some(&sidebar_container));
    paned.set_end_child(Some(&stack));

    (paned, sidebar_container, mode_list, stack)
}
