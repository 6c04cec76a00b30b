use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;

use iioaccel_device::{DataChannel, Device, DeviceEnumerator, DeviceError, Multiplexer, Token};
use iioaccel_frame::{AccelReading, AssemblerStats, FrameAssembler, ReadingDecoder, ScanDescriptor};
use tracing::{debug, info, warn};

use crate::buffer::ScanBuffer;
use crate::driver::{DriverInfo, ReadingsCallback};
use crate::error::{BufferError, DriverError, Result};
use crate::polling::{PollState, PollingController};
use crate::trigger::{resolve_trigger, TriggerBinding};

/// An open accelerometer: configured scan buffer, nonblocking data
/// channel, and the state needed to turn readiness into readings.
///
/// Owned by whoever opened it. [`DeviceSession::close`] tears it down in
/// order; dropping it without closing still releases the scan buffer.
pub struct DeviceSession {
    info: DriverInfo,
    device: Box<dyn Device>,
    trigger: TriggerBinding,
    descriptor: ScanDescriptor,
    buffer: Rc<dyn ScanBuffer>,
    channel: DataChannel,
    assembler: FrameAssembler,
    decoder: ReadingDecoder,
    callback: ReadingsCallback,
    polling: PollingController,
    released: bool,
}

impl DeviceSession {
    /// Resolve the trigger, configure the scan buffer and open the data
    /// channel for `device`.
    ///
    /// Anything acquired before a failure is released before the error is
    /// returned. The session starts Idle.
    pub fn open(
        info: DriverInfo,
        bus: &dyn DeviceEnumerator,
        buffer: Rc<dyn ScanBuffer>,
        device: Box<dyn Device>,
        callback: ReadingsCallback,
    ) -> Result<Self> {
        let trigger = resolve_trigger(bus, device.as_ref()).ok_or_else(|| DriverError::NoTriggerFound {
            device: device.sysname().to_string(),
        })?;

        let descriptor =
            buffer
                .build(device.as_ref(), trigger.name())
                .map_err(|source| DriverError::BufferConfig {
                    device: device.sysname().to_string(),
                    source,
                })?;

        let (decoder, channel) = match acquire(device.as_ref(), &descriptor) {
            Ok(parts) => parts,
            Err(err) => {
                buffer.release(device.as_ref());
                return Err(err);
            }
        };

        info!(
            device = device.sysname(),
            trigger = %trigger,
            frame_size = descriptor.frame_size(),
            scale = decoder.scale(),
            "opened device"
        );

        Ok(Self {
            info,
            assembler: FrameAssembler::for_descriptor(&descriptor),
            device,
            trigger,
            descriptor,
            buffer,
            channel,
            decoder,
            callback,
            polling: PollingController::new(),
            released: false,
        })
    }

    pub fn info(&self) -> &DriverInfo {
        &self.info
    }

    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub fn trigger(&self) -> &TriggerBinding {
        &self.trigger
    }

    pub fn descriptor(&self) -> &ScanDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> PollState {
        self.polling.state()
    }

    /// Readiness token while polling is Active.
    pub fn token(&self) -> Option<Token> {
        self.polling.token()
    }

    /// Frame counters for the life of the session.
    pub fn stats(&self) -> AssemblerStats {
        self.assembler.stats()
    }

    /// Bytes of a partial frame waiting for the next notification.
    pub fn pending(&self) -> usize {
        self.assembler.pending()
    }

    /// Start or stop readiness registration. Idempotent.
    pub fn set_polling(&mut self, mux: &mut dyn Multiplexer, active: bool) -> Result<()> {
        let fd = self.channel.as_raw_fd();
        let changed = self
            .polling
            .set(mux, fd, active)
            .map_err(DriverError::Registration)?;
        if changed {
            info!(device = self.device.sysname(), state = ?self.polling.state(), "polling changed");
        }
        Ok(())
    }

    /// Handle one readiness notification.
    ///
    /// Drains the channel and hands the newest complete reading to the
    /// callback. Does nothing while Idle. A read failure stops polling
    /// before the error is returned.
    pub fn dispatch(&mut self, mux: &mut dyn Multiplexer) -> Result<Option<AccelReading>> {
        if self.polling.state() == PollState::Idle {
            return Ok(None);
        }

        let decoded = self
            .assembler
            .read_latest(&mut self.channel)
            .and_then(|frame| frame.map(|frame| self.decoder.decode(&frame)).transpose());

        match decoded {
            Ok(Some(reading)) => {
                (self.callback)(&self.info, &reading);
                Ok(Some(reading))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                warn!(device = self.device.sysname(), %err, "stream read failed; stopping polling");
                if let Err(stop_err) = self.polling.stop(mux) {
                    warn!(%stop_err, "failed to deregister after read failure");
                }
                Err(DriverError::StreamRead(err))
            }
        }
    }

    /// Stop polling, release the scan buffer, then close the channel.
    pub fn close(mut self, mux: &mut dyn Multiplexer) {
        if let Err(err) = self.polling.stop(mux) {
            warn!(device = self.device.sysname(), %err, "failed to stop polling on close");
        }
        self.release();
        debug!(device = self.device.sysname(), stats = ?self.assembler.stats(), "closed device");
    }

    fn release(&mut self) {
        if !self.released {
            self.buffer.release(self.device.as_ref());
            self.released = true;
        }
    }
}

impl AsRawFd for DeviceSession {
    fn as_raw_fd(&self) -> RawFd {
        self.channel.as_raw_fd()
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("device", &self.device.sysname())
            .field("trigger", &self.trigger.name())
            .field("frame_size", &self.descriptor.frame_size())
            .field("state", &self.polling.state())
            .finish()
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Some(token) = self.polling.abandon() {
            warn!(
                device = self.device.sysname(),
                token = token.0,
                "session dropped while polling; registration left in multiplexer"
            );
        }
        self.release();
    }
}

fn acquire(device: &dyn Device, descriptor: &ScanDescriptor) -> Result<(ReadingDecoder, DataChannel)> {
    let decoder = ReadingDecoder::new(descriptor).map_err(|err| DriverError::BufferConfig {
        device: device.sysname().to_string(),
        source: BufferError::Layout(err),
    })?;

    let path = device
        .device_file()
        .ok_or_else(|| DriverError::ChannelOpen(DeviceError::NoDeviceFile(device.sysname().to_string())))?;

    let channel = DataChannel::open(&path).map_err(|err| match err {
        DeviceError::Configure { .. } => DriverError::ChannelConfig(err),
        other => DriverError::ChannelOpen(other),
    })?;
    Ok((decoder, channel))
}
