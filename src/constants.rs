//! Application-wide constants for Nexus AI.
//!
//! Centralizes model identifiers, storage keys and the fixed user-facing
//! strings so that panes and tests agree on them.

// ============================================================================
// Application Identity
// ============================================================================

/// GTK Application ID following reverse-DNS convention.
pub const APP_ID: &str = "com.github.nexus-ai";

/// Application name displayed in window title and sidebar.
pub const APP_NAME: &str = "Nexus AI";

/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "nexus-ai";

// ============================================================================
// Window Configuration
// ============================================================================

/// Default window width in pixels.
pub const DEFAULT_WINDOW_WIDTH: i32 = 1200;

/// Default window height in pixels.
pub const DEFAULT_WINDOW_HEIGHT: i32 = 800;

/// Width of the navigation sidebar in pixels.
pub const SIDEBAR_WIDTH: i32 = 256;

// ============================================================================
// Gemini API
// ============================================================================

/// Base URL for the Gemini REST API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header carrying the API key.
pub const GEMINI_API_KEY_HEADER: &str = "x-goog-api-key";

/// Environment variables checked (in order) for an API key.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Model used for the streamed chat session.
pub const CHAT_MODEL: &str = "gemini-2.5-flash";

/// Model used for the deep reasoning tier.
pub const COMPLEX_MODEL: &str = "gemini-2.5-pro";

/// Model used for the low-latency tier.
pub const FAST_MODEL: &str = "gemini-2.5-flash-lite";

/// Model used for search-grounded answers.
pub const GROUNDED_MODEL: &str = "gemini-2.5-flash";

/// Model used for image edits.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Thinking budget for the deep reasoning tier (maximum allowed by the pro model).
pub const DEEP_THINKING_BUDGET: u32 = 32768;

/// Persona given to the chat model.
pub const CHAT_SYSTEM_INSTRUCTION: &str = "Sen, Nexus adında, dost canlısı ve son derece yardımsever bir yapay zeka asistanısın. Konuşkan, yaratıcı ve destekleyici ol. Kullanıcılar adını sorduğunda, 'Merhaba! Benim adım Nexus. Ben eğitilmiş büyük bir dil modeliyim.' şeklinde yanıt ver.";

// ============================================================================
// Durable Storage Keys
// ============================================================================

/// File name of the key-value store inside the data directory.
pub const STORAGE_DIR_NAME: &str = "storage";

pub const CHAT_HISTORY_KEY: &str = "nexus_chatHistory";
pub const SOURCE_IMAGE_KEY: &str = "nexus_sourceImageUrl";
pub const EDITED_IMAGE_KEY: &str = "nexus_editedImageUrl";
pub const IMAGE_PROMPT_KEY: &str = "nexus_imagePrompt";
pub const ACTIVE_MODE_KEY: &str = "nexus_activeMode";

// ============================================================================
// Chat
// ============================================================================

/// Glyph appended to a model turn while it is still streaming.
pub const STREAMING_CURSOR: char = '▋';

// ============================================================================
// Image Editing
// ============================================================================

/// MIME types accepted by the image editor.
pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

// ============================================================================
// User-Facing Messages
// ============================================================================

pub const CHAT_ERROR_MESSAGE: &str = "Üzgünüm, bir hatayla karşılaştım. Lütfen tekrar deneyin.";
pub const COMPLEX_ERROR_MESSAGE: &str =
    "Karmaşık sorgunuz işlenirken bir hata oluştu. Lütfen tekrar deneyin.";
pub const FAST_ERROR_MESSAGE: &str =
    "Hızlı yanıt oluşturulurken bir hata oluştu. Lütfen tekrar deneyin.";
pub const GROUNDED_ERROR_MESSAGE: &str = "Temellendirilmiş bilgi alınırken bir hata oluştu.";
pub const IMAGE_VALIDATION_MESSAGE: &str = "Lütfen bir resim yükleyin ve bir istem girin.";
pub const IMAGE_NOT_RETURNED_MESSAGE: &str =
    "Resim düzenlenemedi. Model bir resim döndürmemiş olabilir.";
pub const IMAGE_UNEXPECTED_MESSAGE: &str =
    "Beklenmeyen bir hata oluştu. Lütfen konsolu kontrol edin.";
pub const IMAGE_UNSUPPORTED_MESSAGE: &str = "Yalnızca PNG, JPG veya WEBP resimleri desteklenir.";
pub const IMAGE_REUPLOAD_NOTICE: &str =
    "Uygulamayı yeniden başlattığınız için düzenlemeye devam etmek için lütfen resmi tekrar yükleyin.";
pub const MISSING_API_KEY_MESSAGE: &str =
    "API anahtarı bulunamadı. Ayarlardan veya GEMINI_API_KEY ile ekleyin.";
pub const SOURCES_HEADING: &str = "Kaynaklar";
