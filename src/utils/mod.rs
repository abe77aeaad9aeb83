pub mod dates;
pub mod filenames;
pub mod html;
pub mod id_number;
pub mod sources;
