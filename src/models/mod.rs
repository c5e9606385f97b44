pub mod chatmodel;
pub mod ordermodel;
pub mod usermodel;
