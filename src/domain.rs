mod content;
mod email_address;
mod locale;
mod person_name;
mod slug;
mod status;

pub use content::{ContentKey, ContentValue};
pub use email_address::EmailAddress;
pub use locale::{localize, Language, LanguageQuery, LocalizedFields, LocalizedText};
pub use person_name::PersonName;
pub use slug::Slug;
pub use status::PublishStatus;
