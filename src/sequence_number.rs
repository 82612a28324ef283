type SequenceNumberInnerType = u16;

/// Echo sequence number, advanced once per probe cycle.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct SequenceNumber(SequenceNumberInnerType);

impl SequenceNumber {
    pub(crate) fn start_value() -> SequenceNumber {
        // Sequence numbers start from 1 and skip 0 on wrap-around.
        SequenceNumber(1)
    }

    pub(crate) fn next(self) -> Self {
        if self.0 == SequenceNumberInnerType::MAX {
            Self::start_value()
        } else {
            SequenceNumber(self.0 + 1)
        }
    }
}

impl From<SequenceNumber> for SequenceNumberInnerType {
    fn from(value: SequenceNumber) -> Self {
        value.0
    }
}

impl From<SequenceNumberInnerType> for SequenceNumber {
    fn from(value: SequenceNumberInnerType) -> Self {
        SequenceNumber(value)
    }
}
