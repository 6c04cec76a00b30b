//! In-memory collaborators and a throwaway sysfs tree for driver tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::ffi::CString;
use std::fs;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use iioaccel_device::{Device, DeviceEnumerator, DeviceError, Multiplexer, Token};
use iioaccel_frame::{ChannelSpec, ScanDescriptor, ACCEL_X, ACCEL_Y, ACCEL_Z};

use crate::buffer::ScanBuffer;
use crate::error::BufferError;

#[derive(Debug, Clone)]
pub struct MemoryDevice {
    sysname: String,
    subsystem: Option<String>,
    attrs: BTreeMap<String, String>,
    syspath: PathBuf,
    device_file: Option<PathBuf>,
}

impl MemoryDevice {
    pub fn new(sysname: &str) -> Self {
        Self {
            sysname: sysname.to_string(),
            subsystem: Some("iio".to_string()),
            attrs: BTreeMap::new(),
            syspath: PathBuf::from("/sys/bus/iio/devices").join(sysname),
            device_file: None,
        }
    }

    pub fn on_subsystem(mut self, subsystem: Option<&str>) -> Self {
        self.subsystem = subsystem.map(str::to_string);
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_device_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_file = Some(path.into());
        self
    }

    pub fn accel(number: u32) -> Self {
        Self::new(&format!("iio:device{number}")).attr("name", "accel_3d")
    }

    pub fn trigger(number: u32, name: &str) -> Self {
        Self::new(&format!("trigger{number}")).attr("name", name)
    }
}

impl Device for MemoryDevice {
    fn subsystem(&self) -> Option<&str> {
        self.subsystem.as_deref()
    }

    fn sysname(&self) -> &str {
        &self.sysname
    }

    fn sysfs_attr(&self, name: &str) -> Option<String> {
        self.attrs.get(name).cloned()
    }

    fn sysfs_path(&self) -> &Path {
        &self.syspath
    }

    fn device_file(&self) -> Option<PathBuf> {
        self.device_file.clone()
    }
}

/// A bus holding a fixed device list; `None` simulates an enumeration failure.
pub struct MemoryBus(pub Option<Vec<MemoryDevice>>);

impl DeviceEnumerator for MemoryBus {
    fn devices(&self, subsystem: &str) -> iioaccel_device::Result<Vec<Box<dyn Device>>> {
        let devices = self.0.as_ref().ok_or_else(|| DeviceError::Enumerate {
            path: PathBuf::from("/sys/bus").join(subsystem),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        })?;
        Ok(devices
            .iter()
            .filter(|d| d.subsystem.as_deref() == Some(subsystem))
            .map(|d| Box::new(d.clone()) as Box<dyn Device>)
            .collect())
    }
}

/// A scan buffer that hands out a fixed descriptor and counts calls.
pub struct CountingBuffer {
    descriptor: Option<ScanDescriptor>,
    pub builds: Cell<usize>,
    pub releases: Cell<usize>,
    pub triggers: RefCell<Vec<String>>,
}

impl CountingBuffer {
    pub fn new(descriptor: Option<ScanDescriptor>) -> Self {
        Self {
            descriptor,
            builds: Cell::new(0),
            releases: Cell::new(0),
            triggers: RefCell::new(Vec::new()),
        }
    }
}

impl ScanBuffer for CountingBuffer {
    fn build(&self, _device: &dyn Device, trigger: &str) -> Result<ScanDescriptor, BufferError> {
        self.builds.set(self.builds.get() + 1);
        self.triggers.borrow_mut().push(trigger.to_string());
        self.descriptor.clone().ok_or(BufferError::NoChannels)
    }

    fn release(&self, _device: &dyn Device) {
        self.releases.set(self.releases.get() + 1);
    }
}

/// A multiplexer that records registrations without polling anything.
#[derive(Default)]
pub struct CountingMux {
    pub live: HashSet<Token>,
    pub registers: usize,
    pub deregisters: usize,
    next: usize,
}

impl Multiplexer for CountingMux {
    fn register(&mut self, _fd: RawFd) -> std::io::Result<Token> {
        self.registers += 1;
        self.next += 1;
        let token = Token(self.next);
        self.live.insert(token);
        Ok(token)
    }

    fn deregister(&mut self, token: Token) -> std::io::Result<()> {
        self.deregisters += 1;
        if self.live.remove(&token) {
            Ok(())
        } else {
            Err(std::io::Error::from(std::io::ErrorKind::NotFound))
        }
    }
}

/// Three little-endian s16 axes at offsets 0, 2, 4 sharing `scale`.
pub fn xyz_descriptor(scale: f64) -> ScanDescriptor {
    let axis = |index: u32| ChannelSpec {
        index,
        offset: index as usize * 2,
        scale,
        ..ChannelSpec::default()
    };
    ScanDescriptor::new(
        6,
        [
            (ACCEL_X.to_string(), axis(0)),
            (ACCEL_Y.to_string(), axis(1)),
            (ACCEL_Z.to_string(), axis(2)),
        ],
    )
    .expect("xyz layout is valid")
}

pub fn frame_bytes(x: i16, y: i16, z: i16) -> Vec<u8> {
    [x, y, z].iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn unique_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "iioaccel-driver-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

pub fn mkfifo(path: &Path) {
    let c_path = CString::new(path.as_os_str().as_bytes()).expect("path has no NUL");
    // SAFETY: `c_path` is a valid NUL-terminated path string.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    assert_eq!(rc, 0, "mkfifo failed: {}", std::io::Error::last_os_error());
}

/// A fake `/sys` + `/dev` tree rooted in a temp directory.
pub struct FakeSysfs {
    pub root: PathBuf,
}

impl FakeSysfs {
    pub fn new(tag: &str) -> Self {
        let root = unique_dir(tag);
        fs::create_dir_all(root.join("dev")).expect("dev dir should be creatable");
        fs::create_dir_all(root.join("bus/iio/devices")).expect("bus dir should be creatable");
        Self { root }
    }

    pub fn dev_root(&self) -> PathBuf {
        self.root.join("dev")
    }

    pub fn device_dir(&self, sysname: &str) -> PathBuf {
        self.root.join("bus/iio/devices").join(sysname)
    }

    /// A trigger-style device: a directory with a `name` attribute.
    pub fn add_named(&self, sysname: &str, name: &str) -> PathBuf {
        let dir = self.device_dir(sysname);
        fs::create_dir_all(&dir).expect("device dir should be creatable");
        fs::write(dir.join("name"), format!("{name}\n")).expect("name should be writable");
        dir
    }

    /// A buffered device with a FIFO standing in for its character file.
    pub fn add_buffered(&self, sysname: &str, name: &str) -> PathBuf {
        let dir = self.add_named(sysname, name);
        fs::write(dir.join("dev"), "250:0\n").expect("dev should be writable");
        fs::create_dir_all(dir.join("buffer")).expect("buffer dir should be creatable");
        fs::create_dir_all(dir.join("trigger")).expect("trigger dir should be creatable");
        fs::create_dir_all(dir.join("scan_elements")).expect("scan dir should be creatable");
        fs::write(dir.join("buffer/enable"), "0\n").expect("enable should be writable");
        fs::write(dir.join("buffer/length"), "2\n").expect("length should be writable");
        fs::write(dir.join("trigger/current_trigger"), "\n").expect("trigger should be writable");
        mkfifo(&self.dev_root().join(sysname));
        dir
    }

    pub fn add_scan_element(&self, device: &Path, name: &str, index: u32, ty: &str, enabled: bool) {
        let scan = device.join("scan_elements");
        fs::write(scan.join(format!("{name}_en")), if enabled { "1\n" } else { "0\n" })
            .expect("en should be writable");
        fs::write(scan.join(format!("{name}_index")), format!("{index}\n"))
            .expect("index should be writable");
        fs::write(scan.join(format!("{name}_type")), format!("{ty}\n"))
            .expect("type should be writable");
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path)
            .expect("attribute should be readable")
            .trim_end()
            .to_string()
    }
}

impl Drop for FakeSysfs {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
