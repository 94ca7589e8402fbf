use crate::passkey::errors::PasskeyError;
use crate::passkey::types::CeremonyType;

/// Lifecycle of a single ceremony attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyState {
    Idle,
    ChallengeIssued,
    ResponseReceived,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyEvent {
    /// A challenge was issued; replaces any earlier one
    Issue,
    /// The client submitted a response
    Submit,
    /// Decoding and verification succeeded
    Accept,
    /// Decoding or verification failed
    Reject,
}

impl CeremonyState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }

    /// Transition table. Events out of order give `NoActiveChallenge`.
    ///
    /// [`PasskeyCeremony`](super::PasskeyCeremony) never hits that arm: a
    /// finish step only builds its attempt in `ChallengeIssued` after the
    /// challenge store has handed the challenge over, so a missing challenge
    /// surfaces from the store's take instead.
    pub fn next(self, event: CeremonyEvent) -> Result<Self, PasskeyError> {
        use CeremonyEvent::*;
        use CeremonyState::*;

        match (self, event) {
            (_, Issue) => Ok(ChallengeIssued),
            (ChallengeIssued, Submit) => Ok(ResponseReceived),
            (Verified | Rejected, Submit) => Err(PasskeyError::ChallengeAlreadyUsed),
            (ResponseReceived, Accept) => Ok(Verified),
            (ResponseReceived, Reject) => Ok(Rejected),
            _ => Err(PasskeyError::NoActiveChallenge),
        }
    }
}

/// Tracks one attempt through the state machine and logs each transition.
#[derive(Debug)]
pub(crate) struct CeremonyAttempt<'a> {
    user_name: &'a str,
    ceremony: CeremonyType,
    state: CeremonyState,
}

impl<'a> CeremonyAttempt<'a> {
    pub(crate) fn new(user_name: &'a str, ceremony: CeremonyType, state: CeremonyState) -> Self {
        Self {
            user_name,
            ceremony,
            state,
        }
    }

    pub(crate) fn advance(&mut self, event: CeremonyEvent) -> Result<CeremonyState, PasskeyError> {
        let next = self.state.next(event)?;
        tracing::debug!(
            "{} ceremony for {}: {:?} -> {:?}",
            self.ceremony,
            self.user_name,
            self.state,
            next
        );
        self.state = next;
        Ok(next)
    }

    /// Records the outcome of verification and passes it through.
    pub(crate) fn conclude<T>(
        &mut self,
        outcome: Result<T, PasskeyError>,
    ) -> Result<T, PasskeyError> {
        match outcome {
            Ok(value) => {
                self.advance(CeremonyEvent::Accept)?;
                tracing::info!("{} ceremony verified for {}", self.ceremony, self.user_name);
                Ok(value)
            }
            Err(e) => {
                self.advance(CeremonyEvent::Reject)?;
                Err(e.log())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> CeremonyState {
        self.state
    }
}
