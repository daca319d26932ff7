use super::Location;

/// Шаг диалога подписки. Отсутствие записи означает, что диалога нет.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationState {
    AwaitingLocation,
    AwaitingTime { location: Location },
}
