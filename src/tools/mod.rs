mod exiftool_info;
mod file_hasher;
mod file_scanner;
mod path_validator;

pub use exiftool_info::{get_exif_info, is_exiftool_available, map_exiftool_tags};
pub use file_hasher::{HashAlgorithm, calculate_file_hash};
pub use file_scanner::scan_media_files;
pub use path_validator::{
    ensure_directory_exists, validate_directory_exists, validate_source_and_destination,
};
