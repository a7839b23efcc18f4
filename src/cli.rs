use log::{debug, error};
use std::io::{self, BufRead, Write};

use crate::command::Origin;
use crate::config::Config;
use crate::sh::Shell;
use crate::signal;

pub struct Cli {
    sh: Shell,
}

impl Cli {
    pub fn new(config: Config) -> Cli {
        // setup signal handler
        if let Err(e) = signal::install_handlers() {
            error!("smash error: failed to set ctrl-C handler: {}", e.desc());
        }
        Cli {
            sh: Shell::new(config),
        }
    }

    fn prompt(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{}> ", self.sh.prompt())?;
        stdout.flush()
    }

    /// Reads and runs lines until stdin closes.
    pub fn go(&mut self) {
        let stdin = io::stdin();
        let mut buf = String::new();
        loop {
            if let Err(e) = self.prompt() {
                error!("could not print prompt: {}", e);
            }
            buf.clear();
            match stdin.lock().read_line(&mut buf) {
                Ok(0) => break,
                Ok(_) => self.sh.execute_line(&buf, Origin::Prompt),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("could not read command: {}", e);
                    break;
                }
            }
        }
        debug!("stdin closed, leaving");
    }
}
