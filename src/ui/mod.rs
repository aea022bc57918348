// UI and formatting module

pub mod formatters;
pub mod progress;
pub mod prompts;

// Re-export commonly used items for cleaner imports
pub use formatters::{format_bit_rate, format_clock, format_duration, format_size, print_media_info};
pub use progress::{clear_line, show_time_progress, show_transfer_progress};
pub use prompts::{
    confirm, dimmed, error, header, info, input_text, read_choice, select_index, success, warn,
};
