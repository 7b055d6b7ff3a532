use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Cursor, Write};
use std::rc::Rc;

use console::Term;

const DEFAULT_WIDTH: usize = 80;

/// Line-oriented console: prompts read from `input`, everything else is
/// written to `output`. A progress line is overwritten in place until the
/// next regular line is printed.
pub struct Console {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    term: Option<Term>,
    progress_active: bool,
}

impl Console {
    pub fn stdio() -> Self {
        let term = Term::stdout();
        Self {
            input: Box::new(BufReader::new(io::stdin())),
            output: Box::new(io::stdout()),
            term: term.is_term().then_some(term),
            progress_active: false,
        }
    }

    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            term: None,
            progress_active: false,
        }
    }

    /// A console fed from `input` whose output can be read back.
    pub fn capture(input: impl Into<String>) -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        let console = Self::new(Cursor::new(input.into().into_bytes()), captured.clone());
        (console, captured)
    }

    pub fn width(&self) -> usize {
        self.term
            .as_ref()
            .map(|t| t.size().1 as usize)
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_WIDTH)
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        match &self.term {
            Some(term) => term.clear_screen(),
            None => Ok(()),
        }
    }

    fn end_progress(&mut self) -> io::Result<()> {
        if self.progress_active {
            self.progress_active = false;
            writeln!(self.output)?;
        }
        Ok(())
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        self.end_progress()?;
        writeln!(self.output, "{}", text.as_ref())
    }

    pub fn blank(&mut self) -> io::Result<()> {
        self.line("")
    }

    pub fn warning(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        self.line(format!("WARNING: {}", message.as_ref()))
    }

    pub fn failure(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        self.line(format!("FAILURE: {}", message.as_ref()))
    }

    pub fn progress(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        write!(self.output, "\r{}", text.as_ref())?;
        self.output.flush()?;
        self.progress_active = true;
        Ok(())
    }

    /// Prints `question` and returns the trimmed answer. End of input is an
    /// error so callers that loop on bad answers always terminate.
    pub fn prompt(&mut self, question: &str) -> io::Result<String> {
        self.end_progress()?;
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            writeln!(self.output)?;
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        Ok(answer.trim().to_string())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

#[derive(Clone, Default)]
pub struct CapturedOutput {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
