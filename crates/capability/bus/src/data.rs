use crate::error::BusError;
use crate::payload::BusPayload;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// 总线信封：topic + 类型标签 + 已编码载荷。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusData {
    pub topic: String,
    pub type_name: String,
    pub data: Vec<u8>,
}

impl BusData {
    pub fn encode<P: BusPayload>(topic: impl Into<String>, payload: &P) -> Result<Self, BusError> {
        let data = serde_json::to_vec(payload).map_err(|err| BusError::Encode(err.to_string()))?;
        Ok(Self {
            topic: topic.into(),
            type_name: P::TYPE_NAME.to_string(),
            data,
        })
    }

    /// 按类型标签校验后解码。
    pub fn decode<P: BusPayload>(&self) -> Result<P, BusError> {
        if self.type_name != P::TYPE_NAME {
            return Err(BusError::TypeMismatch {
                expected: P::TYPE_NAME.to_string(),
                actual: self.type_name.clone(),
            });
        }
        serde_json::from_slice(&self.data).map_err(|err| BusError::Decode(err.to_string()))
    }

    /// 长度前缀帧：`[u32 topic][topic][u32 type][type][u32 data][data]`，大端。
    pub fn to_frame(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            12 + self.topic.len() + self.type_name.len() + self.data.len(),
        );
        put_chunk(&mut buf, self.topic.as_bytes());
        put_chunk(&mut buf, self.type_name.as_bytes());
        put_chunk(&mut buf, &self.data);
        buf.freeze()
    }

    pub fn from_frame(frame: &[u8]) -> Result<Self, BusError> {
        let mut buf = frame;
        let topic = take_string(&mut buf, "topic")?;
        let type_name = take_string(&mut buf, "type")?;
        let data = take_chunk(&mut buf, "data")?;
        if buf.has_remaining() {
            return Err(BusError::Frame(format!(
                "{} trailing bytes",
                buf.remaining()
            )));
        }
        Ok(Self {
            topic,
            type_name,
            data,
        })
    }
}

fn put_chunk(buf: &mut BytesMut, chunk: &[u8]) {
    buf.put_u32(chunk.len() as u32);
    buf.put_slice(chunk);
}

fn take_chunk(buf: &mut &[u8], part: &str) -> Result<Vec<u8>, BusError> {
    if buf.remaining() < 4 {
        return Err(BusError::Frame(format!("missing {part} length")));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(BusError::Frame(format!(
            "{part} truncated: want {len}, have {}",
            buf.remaining()
        )));
    }
    let chunk = buf[..len].to_vec();
    buf.advance(len);
    Ok(chunk)
}

fn take_string(buf: &mut &[u8], part: &str) -> Result<String, BusError> {
    let chunk = take_chunk(buf, part)?;
    String::from_utf8(chunk).map_err(|_| BusError::Frame(format!("{part} is not utf-8")))
}
