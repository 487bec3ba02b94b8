/// Interactive views
///
/// - `form.rs` - generation form and last result
/// - `gallery.rs` - archive statistics and image grid

pub mod form;
pub mod gallery;
