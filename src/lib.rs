// src/lib.rs

//! edu-admin: administration toolkit for colleges, entrance exams and
//! admin accounts.

pub mod error;
pub mod forms;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
