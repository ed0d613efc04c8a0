pub mod serial_thread;
