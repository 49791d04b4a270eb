use crate::print::Printer;
use crate::signal::CancelToken;
use std::io::{self, Write};
use std::process::{Command, Stdio};

const PAGER: &str = "less";
const PAGER_ARGS: &[&str] = &["-F", "-S", "-w"];

/// Whether text of this width should go through the pager.
pub fn needs_pager(printer: &Printer, text: &str) -> bool {
    if !printer.stdout_is_terminal() {
        return false;
    }
    let (_, columns) = console::Term::stdout().size();
    let widest = text
        .lines()
        .map(console::measure_text_width)
        .max()
        .unwrap_or(0);
    widest > usize::from(columns)
}

/// Pipes `text` into `less -F -S -w`. Falls back to writing directly when the
/// pager cannot be started or fed; pager failures are only reported at info
/// verbosity.
pub fn display(printer: &Printer, cancel: &CancelToken, text: &str) {
    let _section = cancel.cooperate();
    let mut command = Command::new(PAGER);
    command.args(PAGER_ARGS);
    page(printer, command, text);
}

fn page(printer: &Printer, mut command: Command, text: &str) {
    let mut child = match command.stdin(Stdio::piped()).spawn() {
        Ok(child) => child,
        Err(e) => {
            printer.verbose(format!("pager {PAGER:?} is not available: {e}"));
            printer.output(text);
            return;
        }
    };
    if let Some(mut stdin) = child.stdin.take() {
        if !hand_over(printer, &mut stdin, text) {
            let _ = child.kill();
        }
    }
    match child.wait() {
        Ok(status) if !status.success() => {
            printer.verbose(format!("{PAGER} exited with {status}"));
        }
        Ok(_) => {}
        Err(e) => printer.verbose(format!("wait for {PAGER}: {e}")),
    }
}

/// Writes `text` to the pager's input. On failure the text is printed
/// directly instead and `false` is returned.
fn hand_over(printer: &Printer, pager: &mut dyn Write, text: &str) -> bool {
    match pager.write_all(text.as_bytes()) {
        // The user quit the pager early.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => true,
        Err(e) => {
            printer.verbose(format!("failed to pipe output to pager: {e}"));
            printer.output(text);
            false
        }
        Ok(()) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::testing::printer;

    #[test]
    fn test_no_pager_without_terminal() {
        let (p, _, _) = printer("");
        assert!(!needs_pager(&p, &"x".repeat(10_000)));
    }

    struct Refusing(io::ErrorKind);

    impl Write for Refusing {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(self.0, "refused"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_pager_write_prints_directly() {
        let (p, out, _) = printer("");
        assert!(!hand_over(&p, &mut Refusing(io::ErrorKind::Other), "wide table"));
        assert_eq!(out.contents(), "wide table\n");
    }

    #[test]
    fn test_quit_pager_does_not_reprint() {
        let (p, out, _) = printer("");
        assert!(hand_over(&p, &mut Refusing(io::ErrorKind::BrokenPipe), "wide table"));
        assert!(out.contents().is_empty());
    }

    #[test]
    fn test_missing_pager_prints_directly() {
        let (p, out, _) = printer("");
        page(&p, Command::new("stackit-no-such-pager"), "wide table");
        assert_eq!(out.contents(), "wide table\n");
    }
}
