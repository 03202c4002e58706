pub mod db_setup;
