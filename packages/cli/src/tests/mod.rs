mod app_tests;
mod args_tests;
