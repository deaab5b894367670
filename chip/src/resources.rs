use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{definitions::cpu, LoadError};

#[derive(Clone, Debug)]
/// Represents a single rom with it's information
pub struct Rom {
    /// The rom name
    name: String,
    /// The program bytes, placed verbatim at the program start
    data: Box<[u8]>,
}

impl Rom {
    /// Will generate a new rom based of the given data, failing if it does not fit
    /// into the program area of the memory.
    pub fn new(name: &str, data: Box<[u8]>) -> Result<Self, LoadError> {
        if data.len() > cpu::PROGRAM_SIZE {
            return Err(LoadError::TooLarge {
                size: data.len(),
                max: cpu::PROGRAM_SIZE,
            });
        }
        Ok(Rom {
            name: name.to_string(),
            data,
        })
    }

    /// Reads the reader to its end, the whole content has to fit into memory.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, LoadError> {
        let mut data = Vec::new();
        // read one byte past the limit, so that an oversized program is noticed
        // without pulling the whole file into memory
        reader
            .take(cpu::PROGRAM_SIZE as u64 + 1)
            .read_to_end(&mut data)?;
        Self::new(name, data.into_boxed_slice())
    }

    /// Loads the rom stored at the path, the file name is used as the rom name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path)?;
        let rom = Self::from_reader(&name, BufReader::new(file))?;
        log::info!("read program {} of size {}", rom.name, rom.data.len());
        Ok(rom)
    }

    /// Will return a slice internal values of the given data
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    /// Will return the name of the rom.
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_rom_from_reader() {
        let data = [0x00, 0xE0, 0x12, 0x00];
        let rom = Rom::from_reader("CLEAR", Cursor::new(data)).unwrap();
        assert_eq!(rom.get_name(), "CLEAR");
        assert_eq!(rom.get_data(), &data);
    }

    #[test]
    fn test_rom_fills_memory() {
        let data = vec![0xAB; cpu::PROGRAM_SIZE];
        let rom = Rom::from_reader("FULL", Cursor::new(data)).unwrap();
        assert_eq!(rom.get_data().len(), cpu::PROGRAM_SIZE);
    }

    #[test]
    fn test_rom_too_large() {
        let data = vec![0xAB; cpu::PROGRAM_SIZE + 10];
        match Rom::from_reader("HUGE", Cursor::new(data)) {
            Err(LoadError::TooLarge { size, max }) => {
                assert_eq!(size, cpu::PROGRAM_SIZE + 1);
                assert_eq!(max, cpu::PROGRAM_SIZE);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_rom_missing_file() {
        let res = Rom::from_file("this/rom/does/not/exist.ch8");
        assert!(matches!(res, Err(LoadError::Io(_))));
    }
}
