use crate::state::AppState;
use adw::prelude::*;
use adw::{ApplicationWindow, ToastOverlay};
use gtk4::gdk;
use gtk4::{
    Box, Button, ContentFit, Entry, FileDialog, FileFilter, Label, Orientation, Picture, Spinner,
};
use nexus::constants::{ACCEPTED_IMAGE_TYPES, IMAGE_REUPLOAD_NOTICE};
use nexus::image_edit::{edit, ImageEditError, ImageEditor, Phase};
use nexus::utils::{decode_data_uri, extension_for_mime};
use std::cell::RefCell;
use std::rc::Rc;

/// Widgets of the image editor pane.
#[derive(Clone)]
pub struct ImageEditorPane {
    pub root: Box,
    source_picture: Picture,
    edited_picture: Picture,
    notice: Label,
    error_label: Label,
    entry: Entry,
    choose_btn: Button,
    apply_btn: Button,
    reset_btn: Button,
    save_btn: Button,
    spinner: Spinner,
}

impl ImageEditorPane {
    /// Syncs every widget with the editor state.
    pub fn refresh(&self, editor: &ImageEditor) {
        let phase = editor.phase();
        let busy = phase == Phase::Editing;

        show_preview(&self.source_picture, editor.source_preview());
        show_preview(&self.edited_picture, editor.edited_preview());

        self.notice.set_visible(phase == Phase::NeedsReupload);
        match editor.error() {
            Some(message) => {
                self.error_label.set_label(message);
                self.error_label.set_visible(true);
            }
            None => self.error_label.set_visible(false),
        }

        if self.entry.text().as_str() != editor.prompt() {
            self.entry.set_text(editor.prompt());
        }
        self.entry.set_sensitive(!busy);
        self.choose_btn.set_sensitive(!busy);
        self.apply_btn.set_sensitive(editor.can_edit());
        self.reset_btn.set_sensitive(!busy && phase != Phase::Empty);
        self.save_btn.set_sensitive(!busy && editor.edited_preview().is_some());
        if busy {
            self.spinner.start();
        } else {
            self.spinner.stop();
        }
    }
}

fn show_preview(picture: &Picture, uri: Option<&str>) {
    let texture = uri.and_then(|uri| match decode_data_uri(uri) {
        Ok((_, bytes)) => {
            match gdk::Texture::from_bytes(&glib::Bytes::from_owned(bytes)) {
                Ok(texture) => Some(texture),
                Err(e) => {
                    tracing::warn!("Failed to decode preview image: {}", e);
                    None
                }
            }
        }
        Err(e) => {
            tracing::warn!("Invalid preview data: {}", e);
            None
        }
    });
    picture.set_paintable(texture.as_ref());
}

fn create_frame(title: &str, picture: &Picture) -> Box {
    let frame = Box::new(Orientation::Vertical, 6);
    frame.set_hexpand(true);
    let label = Label::builder().label(title).xalign(0.0).build();
    label.add_css_class("heading");
    frame.append(&label);
    frame.append(picture);
    frame
}

fn image_filter() -> FileFilter {
    let filter = FileFilter::new();
    filter.set_name(Some("Resimler (PNG, JPG, WEBP)"));
    for mime in ACCEPTED_IMAGE_TYPES {
        filter.add_mime_type(mime);
    }
    filter
}

pub fn create_image_editor_pane(
    window: &ApplicationWindow,
    toast_overlay: &ToastOverlay,
    state: Rc<RefCell<AppState>>,
) -> ImageEditorPane {
    let editor = state.borrow().image_editor.clone();
    let window = window.clone();
    let toast_overlay = toast_overlay.clone();

    let root = Box::new(Orientation::Vertical, 12);
    root.set_margin_start(24);
    root.set_margin_end(24);
    root.set_margin_top(18);
    root.set_margin_bottom(18);

    let title = Label::builder()
        .label("Görsel Düzenleyici")
        .xalign(0.0)
        .build();
    title.add_css_class("title-2");
    let description = Label::builder()
        .label("Bir resim yükleyin ve Nexus'tan onu metin talimatlarıyla düzenlemesini isteyin.")
        .wrap(true)
        .xalign(0.0)
        .build();
    description.add_css_class("dim-label");

    let notice = Label::builder()
        .label(IMAGE_REUPLOAD_NOTICE)
        .wrap(true)
        .xalign(0.0)
        .visible(false)
        .build();
    notice.add_css_class("warning");

    let source_picture = Picture::builder()
        .content_fit(ContentFit::Contain)
        .vexpand(true)
        .build();
    let edited_picture = Picture::builder()
        .content_fit(ContentFit::Contain)
        .vexpand(true)
        .build();
    let previews = Box::new(Orientation::Horizontal, 12);
    previews.set_homogeneous(true);
    previews.set_vexpand(true);
    previews.append(&create_frame("Orijinal", &source_picture));
    previews.append(&create_frame("Düzenlenmiş", &edited_picture));

    let entry = Entry::builder()
        .placeholder_text("örn., Retro bir filtre ekle, arka plandaki kişiyi kaldır...")
        .hexpand(true)
        .build();

    let choose_btn = Button::builder()
        .icon_name("document-open-symbolic")
        .tooltip_text("Resim Seç")
        .build();
    let spinner = Spinner::new();
    let apply_btn = Button::builder()
        .label("Düzenlemeyi Uygula")
        .sensitive(false)
        .build();
    apply_btn.add_css_class("suggested-action");

    let controls = Box::new(Orientation::Horizontal, 6);
    controls.append(&choose_btn);
    controls.append(&entry);
    controls.append(&spinner);
    controls.append(&apply_btn);

    let reset_btn = Button::builder()
        .icon_name("edit-clear-all-symbolic")
        .tooltip_text("Sıfırla")
        .build();
    let save_btn = Button::builder()
        .icon_name("document-save-symbolic")
        .tooltip_text("Düzenlenmiş Resmi Kaydet")
        .build();
    let actions = Box::new(Orientation::Horizontal, 6);
    actions.set_halign(gtk4::Align::End);
    actions.append(&reset_btn);
    actions.append(&save_btn);

    let error_label = Label::builder()
        .wrap(true)
        .xalign(0.0)
        .visible(false)
        .build();
    error_label.add_css_class("error");

    root.append(&title);
    root.append(&description);
    root.append(&notice);
    root.append(&previews);
    root.append(&controls);
    root.append(&error_label);
    root.append(&actions);

    let pane = ImageEditorPane {
        root,
        source_picture,
        edited_picture,
        notice,
        error_label,
        entry,
        choose_btn,
        apply_btn,
        reset_btn,
        save_btn,
        spinner,
    };
    pane.refresh(&editor.borrow());

    pane.entry.connect_changed(glib::clone!(
        #[weak(rename_to = apply_btn)]
        pane.apply_btn,
        #[strong]
        editor,
        move |entry| {
            let Ok(mut ed) = editor.try_borrow_mut() else {
                return;
            };
            if ed.prompt() != entry.text().as_str() {
                ed.set_prompt(entry.text().as_str());
            }
            apply_btn.set_sensitive(ed.can_edit());
        }
    ));

    pane.choose_btn.connect_clicked(glib::clone!(
        #[weak]
        window,
        #[strong]
        pane,
        #[strong]
        editor,
        move |_| {
            let filters = gio::ListStore::new::<FileFilter>();
            filters.append(&image_filter());
            let dialog = FileDialog::builder()
                .title("Resim Seç")
                .filters(&filters)
                .build();

            dialog.open(
                Some(&window),
                None::<&gio::Cancellable>,
                glib::clone!(
                    #[strong]
                    pane,
                    #[strong]
                    editor,
                    move |res| {
                        let Some(path) = res.ok().and_then(|file| file.path()) else {
                            return;
                        };
                        let mut ed = editor.borrow_mut();
                        if let Err(e) = ed.select_file(&path) {
                            ed.reject_selection(&e);
                        }
                        pane.refresh(&ed);
                    }
                ),
            );
        }
    ));

    let apply = Rc::new(glib::clone!(
        #[strong]
        pane,
        #[strong]
        editor,
        #[strong]
        state,
        move || {
            if !editor.borrow().can_edit() {
                return;
            }
            let backend = state.borrow().backend();
            glib::MainContext::default().spawn_local(glib::clone!(
                #[strong]
                pane,
                #[strong]
                editor,
                async move {
                    let outcome = edit(&editor, backend.as_ref(), |ed| pane.refresh(ed)).await;
                    if let Err(e) = outcome {
                        tracing::debug!("Image edit not started: {}", e);
                        pane.refresh(&editor.borrow());
                    }
                }
            ));
        }
    ));

    pane.entry.connect_activate(glib::clone!(
        #[strong]
        apply,
        move |_| apply()
    ));
    pane.apply_btn.connect_clicked(glib::clone!(
        #[strong]
        apply,
        move |_| apply()
    ));

    pane.reset_btn.connect_clicked(glib::clone!(
        #[strong]
        pane,
        #[strong]
        editor,
        move |_| {
            editor.borrow_mut().reset();
            pane.refresh(&editor.borrow());
        }
    ));

    pane.save_btn.connect_clicked(glib::clone!(
        #[weak]
        window,
        #[weak]
        toast_overlay,
        #[strong]
        editor,
        move |_| {
            let extension = editor
                .borrow()
                .edited_preview()
                .and_then(|uri| decode_data_uri(uri).ok())
                .map(|(mime, _)| extension_for_mime(&mime))
                .unwrap_or("png");
            let dialog = FileDialog::builder()
                .title("Düzenlenmiş Resmi Kaydet")
                .initial_name(format!("nexus-duzenlenmis.{}", extension))
                .build();

            dialog.save(
                Some(&window),
                None::<&gio::Cancellable>,
                glib::clone!(
                    #[strong]
                    editor,
                    #[weak]
                    toast_overlay,
                    move |res| {
                        let Some(path) = res.ok().and_then(|file| file.path()) else {
                            return;
                        };
                        match editor.borrow().save_edited(&path) {
                            Ok(()) => toast_overlay.add_toast(adw::Toast::new(&format!(
                                "Kaydedildi: {}",
                                path.display()
                            ))),
                            Err(ImageEditError::NothingToSave) => {}
                            Err(e) => {
                                tracing::error!("Failed to save edited image: {}", e);
                                toast_overlay
                                    .add_toast(adw::Toast::new("Resim kaydedilemedi."));
                            }
                        }
                    }
                ),
            );
        }
    ));

    pane
}
