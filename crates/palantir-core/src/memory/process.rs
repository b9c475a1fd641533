//! Process discovery and read-only attachment.
//!
//! The game client ships as one of two executables; which one is running
//! dictates the pointer width of every structure we read. Attachment only
//! ever requests read access — the target process is never modified.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::memory::reader::ByteBuffer;

/// Executable name of the 64-bit client.
pub const CLIENT_BINARY_64: &str = "lotroclient64.exe";
/// Executable name of the 32-bit client.
pub const CLIENT_BINARY_32: &str = "lotroclient.exe";

/// A process found during enumeration.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub path: String,
    pub is_64bit: bool,
}

/// Load address and image size of a module inside the target process.
#[derive(Debug, Clone, Copy)]
pub struct ModuleInfo {
    pub base_address: u64,
    pub size: u64,
}

/// Find a running game client, preferring the 64-bit binary.
///
/// The matched executable name dictates bitness; the 32-bit name is only
/// tried when no 64-bit client is running (the 64-bit name contains the
/// 32-bit name as a prefix, so the order matters).
pub fn find_client() -> Option<ProcessInfo> {
    for (binary, is_64bit) in [(CLIENT_BINARY_64, true), (CLIENT_BINARY_32, false)] {
        if let Some(mut found) = find_processes(binary).into_iter().next() {
            found.is_64bit = is_64bit;
            info!(
                "Found game client: {} (PID {}, {})",
                found.name,
                found.pid,
                if found.is_64bit { "64-bit" } else { "32-bit" }
            );
            return Some(found);
        }
    }
    None
}

/// Enumerate processes whose executable name or command line contains
/// `name_pattern` (case-insensitive).
pub fn find_processes(name_pattern: &str) -> Vec<ProcessInfo> {
    platform::find_processes(name_pattern)
}

/// Read handle to a running process.
///
/// Closing is idempotent; dropping the handle closes it.
pub struct ProcessHandle {
    info: ProcessInfo,
    inner: Option<platform::OsHandle>,
}

impl ProcessHandle {
    /// Acquire a read handle for the given process.
    pub fn open(info: ProcessInfo) -> Result<Self> {
        let inner = platform::open(info.pid)?;
        info!(
            "Opened process {} ({})",
            info.pid,
            if info.is_64bit { "64-bit" } else { "32-bit" }
        );
        Ok(Self {
            info,
            inner: Some(inner),
        })
    }

    /// Locate a running game client and attach to it.
    pub fn find_and_open() -> Result<Self> {
        let info = find_client().ok_or(Error::ProcessNotFound)?;
        Self::open(info)
    }

    pub fn info(&self) -> &ProcessInfo {
        &self.info
    }

    pub fn pid(&self) -> u32 {
        self.info.pid
    }

    pub fn is_64bit(&self) -> bool {
        self.info.is_64bit
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Executable name of the client module this process was matched by.
    pub fn client_module_name(&self) -> &'static str {
        if self.info.is_64bit {
            CLIENT_BINARY_64
        } else {
            CLIENT_BINARY_32
        }
    }

    /// Resolve the load address and size of a named module.
    pub fn module(&self, name: &str) -> Result<ModuleInfo> {
        let inner = self.inner.as_ref().ok_or(Error::NotAttached)?;
        platform::module(inner, name)
    }

    /// Read `len` bytes at `address`. Partial reads are failures; the
    /// returned buffer always holds exactly `len` bytes.
    pub fn read_memory(&self, address: u64, len: usize) -> Result<ByteBuffer> {
        let inner = self.inner.as_ref().ok_or(Error::NotAttached)?;
        platform::read_memory(inner, address, len)
    }

    /// Release the handle. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(inner) = self.inner.take() {
            platform::close(inner);
            debug!("Closed process {}", self.info.pid);
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use std::ffi::c_void;

    use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE, HMODULE};
    use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::System::ProcessStatus::{
        EnumProcessModulesEx, GetModuleBaseNameW, GetModuleInformation, LIST_MODULES_ALL,
        MODULEINFO,
    };
    use windows::Win32::System::Threading::{
        IsWow64Process, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
    };

    pub struct OsHandle {
        handle: HANDLE,
    }

    pub fn find_processes(name_pattern: &str) -> Vec<ProcessInfo> {
        let mut results = Vec::new();

        let snapshot = match unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) } {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to create process snapshot: {}", e);
                return results;
            }
        };

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        let needle = name_pattern.to_ascii_lowercase();

        if unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok() {
            loop {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let name = String::from_utf16_lossy(&entry.szExeFile[..len]);

                if name.to_ascii_lowercase().contains(&needle) {
                    results.push(ProcessInfo {
                        pid: entry.th32ProcessID,
                        path: name.clone(),
                        is_64bit: process_is_64bit(entry.th32ProcessID),
                        name,
                    });
                }

                if unsafe { Process32NextW(snapshot, &mut entry) }.is_err() {
                    break;
                }
            }
        }

        let _ = unsafe { CloseHandle(snapshot) };
        results
    }

    fn process_is_64bit(pid: u32) -> bool {
        let Ok(handle) = (unsafe { OpenProcess(PROCESS_QUERY_INFORMATION, false, pid) }) else {
            return true;
        };
        let mut wow64 = BOOL(0);
        let queried = unsafe { IsWow64Process(handle, &mut wow64) };
        let _ = unsafe { CloseHandle(handle) };
        queried.is_ok() && !wow64.as_bool()
    }

    pub fn open(pid: u32) -> Result<OsHandle> {
        let handle =
            unsafe { OpenProcess(PROCESS_VM_READ | PROCESS_QUERY_INFORMATION, false, pid) }
                .map_err(|e| {
                    warn!("OpenProcess failed for PID {}: {}", pid, e);
                    Error::PermissionDenied
                })?;
        Ok(OsHandle { handle })
    }

    pub fn close(handle: OsHandle) {
        let _ = unsafe { CloseHandle(handle.handle) };
    }

    pub fn read_memory(handle: &OsHandle, address: u64, len: usize) -> Result<ByteBuffer> {
        let mut data = vec![0u8; len];
        let mut bytes_read = 0usize;

        unsafe {
            ReadProcessMemory(
                handle.handle,
                address as *const c_void,
                data.as_mut_ptr() as *mut c_void,
                len,
                Some(&mut bytes_read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;

        if bytes_read != len {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("short read: {} of {} bytes", bytes_read, len),
            });
        }

        Ok(ByteBuffer::new(address, data))
    }

    pub fn module(handle: &OsHandle, name: &str) -> Result<ModuleInfo> {
        let mut modules = [HMODULE::default(); 1024];
        let mut needed = 0u32;

        unsafe {
            EnumProcessModulesEx(
                handle.handle,
                modules.as_mut_ptr(),
                std::mem::size_of_val(&modules) as u32,
                &mut needed,
                LIST_MODULES_ALL,
            )
        }
        .map_err(|_| Error::ModuleNotFound(name.to_string()))?;

        let count = (needed as usize / std::mem::size_of::<HMODULE>()).min(modules.len());
        for &module in &modules[..count] {
            let mut buf = [0u16; 260];
            let len = unsafe { GetModuleBaseNameW(handle.handle, module, &mut buf) } as usize;
            if len == 0 {
                continue;
            }
            let module_name = String::from_utf16_lossy(&buf[..len]);
            if !module_name.eq_ignore_ascii_case(name) {
                continue;
            }

            let mut info = MODULEINFO::default();
            unsafe {
                GetModuleInformation(
                    handle.handle,
                    module,
                    &mut info,
                    std::mem::size_of::<MODULEINFO>() as u32,
                )
            }
            .map_err(|_| Error::ModuleNotFound(name.to_string()))?;

            let found = ModuleInfo {
                base_address: info.lpBaseOfDll as u64,
                size: u64::from(info.SizeOfImage),
            };
            info!(
                "Module {} found: base={:#x}, size={:#x}",
                name, found.base_address, found.size
            );
            return Ok(found);
        }

        Err(Error::ModuleNotFound(name.to_string()))
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::*;
    use std::fs::{self, File};
    use std::io::Read;
    use std::os::unix::fs::FileExt;

    pub struct OsHandle {
        pid: u32,
        mem: File,
    }

    pub fn find_processes(name_pattern: &str) -> Vec<ProcessInfo> {
        let mut results = Vec::new();
        let Ok(entries) = fs::read_dir("/proc") else {
            warn!("Failed to open /proc");
            return results;
        };
        let needle = name_pattern.to_ascii_lowercase();

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(pid) = file_name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            let Ok(cmdline) = fs::read(format!("/proc/{pid}/cmdline")) else {
                continue;
            };
            let first = cmdline.split(|&b| b == 0).next().unwrap_or(&[]);
            let path = String::from_utf8_lossy(first).into_owned();
            if !path.to_ascii_lowercase().contains(&needle) {
                continue;
            }

            // Wine command lines may carry Windows-style separators
            let name = path
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(path.as_str())
                .to_string();
            let is_64bit = exe_is_64bit(pid).unwrap_or(true);

            debug!("Found process: {} (PID {})", name, pid);
            results.push(ProcessInfo {
                pid,
                name,
                path,
                is_64bit,
            });
        }

        results
    }

    fn exe_is_64bit(pid: u32) -> Option<bool> {
        let mut header = [0u8; 5];
        let mut file = File::open(format!("/proc/{pid}/exe")).ok()?;
        file.read_exact(&mut header).ok()?;
        // ELF class byte: 1 = 32-bit, 2 = 64-bit
        (header[..4] == [0x7F, b'E', b'L', b'F']).then(|| header[4] == 2)
    }

    pub fn open(pid: u32) -> Result<OsHandle> {
        let path = format!("/proc/{pid}/mem");
        let mem = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied,
            std::io::ErrorKind::NotFound => Error::ProcessNotFound,
            _ => Error::ProcessOpenFailed(e.to_string()),
        })?;
        Ok(OsHandle { pid, mem })
    }

    pub fn close(_handle: OsHandle) {}

    pub fn read_memory(handle: &OsHandle, address: u64, len: usize) -> Result<ByteBuffer> {
        let mut data = vec![0u8; len];
        handle
            .mem
            .read_exact_at(&mut data, address)
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })?;
        Ok(ByteBuffer::new(address, data))
    }

    pub fn module(handle: &OsHandle, name: &str) -> Result<ModuleInfo> {
        let maps = fs::read_to_string(format!("/proc/{}/maps", handle.pid))?;
        let needle = name.to_ascii_lowercase();

        let mut first_start = None;
        let mut last_end = 0u64;
        for line in maps.lines() {
            if !line.to_ascii_lowercase().contains(&needle) {
                continue;
            }
            let Some(range) = line.split_whitespace().next() else {
                continue;
            };
            let Some((start, end)) = range.split_once('-') else {
                continue;
            };
            let (Ok(start), Ok(end)) = (
                u64::from_str_radix(start, 16),
                u64::from_str_radix(end, 16),
            ) else {
                continue;
            };
            if first_start.is_none() {
                first_start = Some(start);
            }
            last_end = end;
        }

        let base = first_start.ok_or_else(|| Error::ModuleNotFound(name.to_string()))?;
        // The maps extent over-counts when sections are split; the PE header's
        // SizeOfImage is authoritative for Wine-mapped modules.
        let size = pe_image_size(handle, base).unwrap_or(last_end.saturating_sub(base));
        info!("Module {} found: base={:#x}, size={:#x}", name, base, size);
        Ok(ModuleInfo {
            base_address: base,
            size,
        })
    }

    fn pe_image_size(handle: &OsHandle, base: u64) -> Option<u64> {
        let dos = read_memory(handle, base, 0x40).ok()?;
        let e_lfanew = u64::from(dos.read_u32(0x3C));
        // SizeOfImage sits 56 bytes into the optional header, which starts
        // 24 bytes after the PE signature for both bitnesses.
        let size = read_memory(handle, base + e_lfanew + 24 + 56, 4)
            .ok()?
            .read_u32(0);
        (size > 0).then_some(u64::from(size))
    }
}
