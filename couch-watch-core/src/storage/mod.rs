pub mod capture_files;
