pub(crate) mod app_paths;
pub(crate) mod stream_settings;
