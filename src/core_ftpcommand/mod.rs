// Here's the list of the FTP commands implemented
pub mod abor;
pub mod cdup;
pub mod cwd;
pub mod dele;
pub mod feat;
pub mod help;
pub mod list;
pub mod mdtm;
pub mod mkd;
pub mod noop;
pub mod opts;
pub mod pass;
pub mod pwd;
pub mod quit;
pub mod rest;
pub mod retr;
pub mod rmd;
pub mod size;
pub mod stor;
pub mod syst;
pub mod type_;
pub mod user;

pub mod ftpcommand;
pub mod handlers;

// The utils and common functions are here
pub mod utils;
