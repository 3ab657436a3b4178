pub mod pbd;
