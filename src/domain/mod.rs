pub mod catalog;
pub mod i18n;
pub mod period;
pub mod validation;
