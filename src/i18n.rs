use crate::filter::Tab;
use crate::gallery::GalleryNotice;
use crate::inbox::NoticeKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    pub fn toggle(self) -> Language {
        match self {
            Language::En => Language::De,
            Language::De => Language::En,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::De => "DE",
        }
    }
}

/// Static UI strings for one language.
pub struct Translations {
    pub inbox_title: &'static str,
    pub gallery_title: &'static str,
    pub tab_all: &'static str,
    pub tab_unread: &'static str,
    pub tab_read: &'static str,
    pub tab_archived: &'static str,
    pub no_messages: &'static str,
    pub no_images: &'static str,
    pub name: &'static str,
    pub unknown_sender: &'static str,
    pub search: &'static str,
    pub confirm_delete_one: &'static str,
    pub confirm_delete_archived: &'static str,
    pub confirm_delete_image: &'static str,
    pub confirm_hint: &'static str,
    pub login_title: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub login_hint: &'static str,
    pub login_failed: &'static str,
    pub upload_title: &'static str,
    pub upload_path: &'static str,
    pub upload_hint: &'static str,
    pub inbox_help: &'static str,
    pub gallery_help: &'static str,
    pub unsaved_reads: &'static str,
    pub archived: &'static str,
    pub archive_failed: &'static str,
    pub restored: &'static str,
    pub restore_failed: &'static str,
    pub deleted: &'static str,
    pub delete_failed: &'static str,
    pub load_failed: &'static str,
    pub gallery_load_failed: &'static str,
    pub nothing_archived: &'static str,
    pub forbidden: &'static str,
    pub invalid_categories: &'static str,
    pub uploaded: &'static str,
    pub upload_failed: &'static str,
}

static EN: Translations = Translations {
    inbox_title: "Messages",
    gallery_title: "Gallery",
    tab_all: "All",
    tab_unread: "Unread",
    tab_read: "Read",
    tab_archived: "Archived",
    no_messages: "No messages in this category.",
    no_images: "No images found.",
    name: "Name",
    unknown_sender: "Unknown",
    search: "Search",
    confirm_delete_one: "Permanently delete this message?",
    confirm_delete_archived: "Permanently delete all archived messages?",
    confirm_delete_image: "Permanently delete this image?",
    confirm_hint: "[y/Enter] delete   [n/Esc] cancel",
    login_title: " Admin Login ",
    email: " E-mail ",
    password: " Password ",
    login_hint: "[Tab] switch field   [Enter] sign in   [Esc] quit",
    login_failed: "Sign-in failed",
    upload_title: " Upload Gallery Image ",
    upload_path: " Image file ",
    upload_hint: "[Tab] file/categories   [Space or 1-9] toggle category (1-3)   [Enter] upload   [Esc] cancel",
    inbox_help: "Tab tabs  Enter open  a archive  r restore  d delete  D delete archived  / search  g gallery  L language  q quit",
    gallery_help: "Tab filter  o open  d delete  u upload  R reload  g inbox  L language  q quit",
    unsaved_reads: "unsaved reads:",
    archived: "Message archived",
    archive_failed: "Could not archive message",
    restored: "Message restored",
    restore_failed: "Could not restore message",
    deleted: "Deleted",
    delete_failed: "Could not delete",
    load_failed: "Could not load messages",
    gallery_load_failed: "Could not load images",
    nothing_archived: "No archived messages",
    forbidden: "Only admins or the uploader may delete this image",
    invalid_categories: "Please select a file and 1-3 categories",
    uploaded: "Upload successful",
    upload_failed: "Upload failed",
};

static DE: Translations = Translations {
    inbox_title: "Nachrichten",
    gallery_title: "Galerie",
    tab_all: "Alle",
    tab_unread: "Ungelesen",
    tab_read: "Gelesen",
    tab_archived: "Archiviert",
    no_messages: "Keine Nachrichten in dieser Kategorie.",
    no_images: "Keine Bilder gefunden.",
    name: "Name",
    unknown_sender: "Unbekannt",
    search: "Suche",
    confirm_delete_one: "Diese Nachricht endgültig löschen?",
    confirm_delete_archived: "Alle archivierten Nachrichten endgültig löschen?",
    confirm_delete_image: "Dieses Bild endgültig löschen?",
    confirm_hint: "[y/Enter] löschen   [n/Esc] abbrechen",
    login_title: " Admin-Anmeldung ",
    email: " E-Mail ",
    password: " Passwort ",
    login_hint: "[Tab] Feld wechseln   [Enter] anmelden   [Esc] beenden",
    login_failed: "Anmeldung fehlgeschlagen",
    upload_title: " Galeriebild hochladen ",
    upload_path: " Bilddatei ",
    upload_hint: "[Tab] Datei/Kategorien   [Leertaste oder 1-9] Kategorie wählen (1-3)   [Enter] hochladen   [Esc] abbrechen",
    inbox_help: "Tab Reiter  Enter öffnen  a archivieren  r wiederherstellen  d löschen  D Archiv löschen  / Suche  g Galerie  L Sprache  q beenden",
    gallery_help: "Tab Filter  o öffnen  d löschen  u hochladen  R neu laden  g Nachrichten  L Sprache  q beenden",
    unsaved_reads: "ungespeichert gelesen:",
    archived: "Nachricht archiviert",
    archive_failed: "Archivieren fehlgeschlagen",
    restored: "Nachricht wiederhergestellt",
    restore_failed: "Wiederherstellen fehlgeschlagen",
    deleted: "Gelöscht",
    delete_failed: "Löschen fehlgeschlagen",
    load_failed: "Nachrichten konnten nicht geladen werden",
    gallery_load_failed: "Bilder konnten nicht geladen werden",
    nothing_archived: "Keine archivierten Nachrichten",
    forbidden: "Nur Admins oder der Uploader dürfen dieses Bild löschen",
    invalid_categories: "Bitte eine Datei und 1-3 Kategorien wählen",
    uploaded: "Hochladen erfolgreich",
    upload_failed: "Hochladen fehlgeschlagen",
};

pub fn translations(lang: Language) -> &'static Translations {
    match lang {
        Language::En => &EN,
        Language::De => &DE,
    }
}

impl Translations {
    pub fn tab(&self, tab: Tab) -> &'static str {
        match tab {
            Tab::All => self.tab_all,
            Tab::Unread => self.tab_unread,
            Tab::Read => self.tab_read,
            Tab::Archived => self.tab_archived,
        }
    }

    pub fn notice(&self, kind: NoticeKind) -> String {
        match kind {
            NoticeKind::LoadFailed => self.load_failed.to_string(),
            NoticeKind::Archived => self.archived.to_string(),
            NoticeKind::ArchiveFailed => self.archive_failed.to_string(),
            NoticeKind::Restored => self.restored.to_string(),
            NoticeKind::RestoreFailed => self.restore_failed.to_string(),
            NoticeKind::Deleted(n) => format!("{}: {}", self.deleted, n),
            NoticeKind::DeleteFailed => self.delete_failed.to_string(),
            NoticeKind::NothingArchived => self.nothing_archived.to_string(),
        }
    }

    pub fn gallery_notice(&self, kind: GalleryNotice) -> &'static str {
        match kind {
            GalleryNotice::LoadFailed => self.gallery_load_failed,
            GalleryNotice::Forbidden => self.forbidden,
            GalleryNotice::InvalidCategories => self.invalid_categories,
            GalleryNotice::Uploaded => self.uploaded,
            GalleryNotice::UploadFailed => self.upload_failed,
            GalleryNotice::Deleted => self.deleted,
            GalleryNotice::DeleteFailed => self.delete_failed,
        }
    }
}
