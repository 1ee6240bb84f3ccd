//! Stdout wrapper whose output can be inspected by tests.

use std::cell::RefCell;
use std::fmt::Write;
use std::thread_local;

#[derive(Default)]
pub struct OutputCapture {
    #[cfg(test)]
    output: String,
}

impl OutputCapture {
    #[cfg(test)]
    fn get_output(&self) -> String {
        self.output.clone()
    }

    #[cfg(test)]
    fn clear_output(&mut self) {
        self.output.clear();
    }
}

impl Write for OutputCapture {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        #[cfg(test)]
        {
            self.output += s;
        }

        print!("{s}");
        Ok(())
    }
}

thread_local! {
    static STDOUT: RefCell<OutputCapture> = Default::default();
}

pub fn output_string<S: AsRef<str>>(s: S) {
    STDOUT.with(|writer| {
        // Writing to OutputCapture never fails
        let _ = writer.borrow_mut().write_str(s.as_ref());
    });
}

#[cfg(test)]
pub fn get_output() -> String {
    STDOUT.with(|output_capture| output_capture.borrow().get_output())
}

#[cfg(test)]
pub fn clear_output() {
    STDOUT.with(|output_capture| output_capture.borrow_mut().clear_output())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_capture_works() {
        clear_output();
        output_string("iadd");
        output_string(" -> isub");
        assert_eq!(get_output(), String::from("iadd -> isub"));

        clear_output();
        assert_eq!(get_output(), String::from(""));
    }
}
