pub mod college_list;
pub mod profile;
pub mod university;
