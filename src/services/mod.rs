pub mod doc_edit_service;
pub mod permission_service;
