pub mod composer_input;
