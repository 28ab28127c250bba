//! File residency: either a memory mapping or a heap-allocated buffer.
//!
//! Both variants expose a plain `&[u8]`, which is what lets every
//! component above this layer treat random access as free: a slice has
//! no shared mutable state, so concurrent positional reads need no
//! synchronization of their own (see the crate-level docs for the
//! caching layer, which is where synchronization actually lives).

use std::{fs, io, path::Path};

use memmap2::Mmap;

pub(crate) enum Mapping {
    Mmap(Mmap),
    Heap(Box<[u8]>),
}

impl Mapping {
    pub(crate) fn mmap(file: &fs::File) -> io::Result<Self> {
        // SAFETY: the archive keeps the backing file open for the
        // lifetime of the mapping, and archives are treated as
        // read-only by every consumer we know of.
        let mmap = unsafe { Mmap::map(file) }?;
        Ok(Self::Mmap(mmap))
    }

    pub(crate) fn heap(mut file: fs::File) -> io::Result<Self> {
        use std::io::Read;

        let size = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        let mut buf = Vec::with_capacity(size);
        file.read_to_end(&mut buf)?;
        Ok(Self::Heap(buf.into_boxed_slice()))
    }

    pub(crate) fn open_mmap<P: AsRef<Path>>(path: P) -> io::Result<(Self, fs::File)> {
        let file = fs::File::open(path)?;
        let mapping = Self::mmap(&file)?;
        Ok((mapping, file))
    }

    pub(crate) fn open_heap<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        Self::heap(file)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        match self {
            Mapping::Mmap(m) => m,
            Mapping::Heap(b) => b,
        }
    }

    pub(crate) fn len(&self) -> u64 {
        self.as_bytes().len() as u64
    }
}
