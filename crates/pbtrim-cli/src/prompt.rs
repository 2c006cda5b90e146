use std::io::{self, BufRead, IsTerminal, Read};

/// Read one keypress from stdin without waiting for Enter.
///
/// When stdin is not a terminal, a whole line is read and its first
/// character is the key (an empty line yields `'\n'`). Returns `None` at end
/// of input.
pub(crate) fn read_key() -> io::Result<Option<char>> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return read_key_from_line(&mut stdin.lock());
    }
    read_raw_key()
}

fn read_key_from_line(reader: &mut impl BufRead) -> io::Result<Option<char>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    Ok(Some(trimmed.chars().next().unwrap_or('\n')))
}

/// Decode one UTF-8 character from a byte source.
fn read_char(reader: &mut impl Read) -> io::Result<Option<char>> {
    let mut buf = [0u8; 4];
    if reader.read(&mut buf[..1])? == 0 {
        return Ok(None);
    }
    let width = match buf[0] {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        b if b >= 0xC0 => 2,
        _ => 1,
    };
    if width > 1 {
        reader.read_exact(&mut buf[1..width])?;
    }
    Ok(Some(
        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER),
    ))
}

#[cfg(unix)]
fn read_raw_key() -> io::Result<Option<char>> {
    use std::os::fd::AsRawFd;

    let stdin = io::stdin();
    let fd = stdin.as_raw_fd();
    let mut original = unsafe {
        // Safe because zeroed memory is immediately initialized by tcgetattr.
        std::mem::zeroed::<libc::termios>()
    };

    if unsafe {
        // Safe because fd is a valid stdin file descriptor and `original` is writable.
        libc::tcgetattr(fd, &mut original)
    } != 0
    {
        return Err(io::Error::last_os_error());
    }

    let mut single_key = original;
    single_key.c_lflag &= !(libc::ICANON | libc::ECHO);
    single_key.c_cc[libc::VMIN] = 1;
    single_key.c_cc[libc::VTIME] = 0;

    if unsafe {
        // Safe because fd is valid and single_key is a valid termios struct.
        libc::tcsetattr(fd, libc::TCSANOW, &single_key)
    } != 0
    {
        return Err(io::Error::last_os_error());
    }

    struct RestoreTermios {
        fd: i32,
        original: libc::termios,
    }

    impl Drop for RestoreTermios {
        fn drop(&mut self) {
            let _ = unsafe {
                // Safe because values were obtained from a successful tcgetattr call.
                libc::tcsetattr(self.fd, libc::TCSANOW, &self.original)
            };
        }
    }

    let _restore = RestoreTermios { fd, original };
    read_char(&mut stdin.lock())
}

#[cfg(windows)]
fn read_raw_key() -> io::Result<Option<char>> {
    use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::System::Console::{
        ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, GetConsoleMode, GetStdHandle, STD_INPUT_HANDLE,
        SetConsoleMode,
    };

    let stdin = io::stdin();
    let handle = unsafe {
        // Safe because STD_INPUT_HANDLE is a constant and the API has no Rust-side invariants.
        GetStdHandle(STD_INPUT_HANDLE)
    };

    if handle.is_null() || handle == INVALID_HANDLE_VALUE {
        return read_key_from_line(&mut stdin.lock());
    }

    let mut mode: u32 = 0;
    if unsafe {
        // Safe because `handle` is a console handle and `mode` is writable.
        GetConsoleMode(handle, &mut mode)
    } == 0
    {
        return read_key_from_line(&mut stdin.lock());
    }

    let new_mode = mode & !(ENABLE_LINE_INPUT | ENABLE_ECHO_INPUT);
    if unsafe {
        // Safe because `handle` and mode flags come from Win32 console APIs.
        SetConsoleMode(handle, new_mode)
    } == 0
    {
        return Err(io::Error::last_os_error());
    }

    struct RestoreConsoleMode {
        handle: HANDLE,
        mode: u32,
    }

    impl Drop for RestoreConsoleMode {
        fn drop(&mut self) {
            let _ = unsafe {
                // Safe because values were produced by successful console-mode calls.
                SetConsoleMode(self.handle, self.mode)
            };
        }
    }

    let _restore = RestoreConsoleMode { handle, mode };
    read_char(&mut stdin.lock())
}

#[cfg(not(any(unix, windows)))]
fn read_raw_key() -> io::Result<Option<char>> {
    read_key_from_line(&mut io::stdin().lock())
}
