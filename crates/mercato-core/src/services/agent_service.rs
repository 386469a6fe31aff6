//! AI-agent concierge chat for listings that enable it.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    AgentChatRequest, AgentConversation, AgentMessage, AgentReply, AgentTranscript, Business,
    MessageRole, Service, User,
};
use crate::ports::{
    AgentRepository, BusinessRepository, ChatCompletionPort, ChatTurn, CoreError,
    ServiceRepository, SettingsRepository,
};

const MAX_USER_MESSAGE_CHARS: usize = 4_000;

pub struct AgentService {
    businesses: Arc<dyn BusinessRepository>,
    services: Arc<dyn ServiceRepository>,
    agents: Arc<dyn AgentRepository>,
    settings: Arc<dyn SettingsRepository>,
    chat: Arc<dyn ChatCompletionPort>,
}

impl AgentService {
    pub fn new(
        businesses: Arc<dyn BusinessRepository>,
        services: Arc<dyn ServiceRepository>,
        agents: Arc<dyn AgentRepository>,
        settings: Arc<dyn SettingsRepository>,
        chat: Arc<dyn ChatCompletionPort>,
    ) -> Self {
        Self {
            businesses,
            services,
            agents,
            settings,
            chat,
        }
    }

    /// Send a visitor message to a listing's agent and return its reply.
    ///
    /// The user turn is stored before the completion call; the assistant
    /// turn is stored only when the completion succeeds.
    pub async fn chat(
        &self,
        visitor: Option<&User>,
        business_id: i64,
        request: AgentChatRequest,
    ) -> Result<AgentReply, CoreError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(CoreError::invalid("message", "is required"));
        }
        if message.chars().count() > MAX_USER_MESSAGE_CHARS {
            return Err(CoreError::invalid("message", "is too long"));
        }

        let business = self.businesses.get_by_id(business_id).await?;
        if !business.is_ai_agent {
            return Err(CoreError::NotFound(format!(
                "business {business_id} has no AI agent"
            )));
        }

        let conversation = match request.conversation_id {
            Some(id) => {
                let conversation = self.agents.get_conversation(id).await?;
                if conversation.business_id != business_id
                    || !self.can_view(visitor, &conversation).await?
                {
                    return Err(CoreError::NotFound(format!("conversation {id}")));
                }
                conversation
            }
            None => {
                self.agents
                    .create_conversation(business_id, visitor.map(|u| u.id))
                    .await?
            }
        };

        let settings = self.settings.load().await?;
        let history = self.agents.list_messages(conversation.id).await?;
        let services = self.services.list_for_business(business_id).await?;

        let mut turns = vec![ChatTurn::new(
            MessageRole::System,
            build_system_prompt(&business, &services),
        )];
        let keep = usize::try_from(settings.ai_max_history).unwrap_or(usize::MAX);
        let skip = history.len().saturating_sub(keep);
        turns.extend(
            history
                .iter()
                .skip(skip)
                .filter(|m| m.role != MessageRole::System)
                .map(|m| ChatTurn::new(m.role, m.content.clone())),
        );
        turns.push(ChatTurn::new(MessageRole::User, message));

        self.agents
            .save_message(conversation.id, MessageRole::User, message)
            .await?;

        let answer = match self.chat.complete(&settings.ai_model, &turns).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(conversation_id = conversation.id, error = %e, "Agent completion failed");
                return Err(e.into());
            }
        };

        let reply = self
            .agents
            .save_message(conversation.id, MessageRole::Assistant, answer.trim())
            .await?;
        info!(
            business_id,
            conversation_id = conversation.id,
            history = turns.len() - 2,
            "Agent replied"
        );

        Ok(AgentReply {
            conversation_id: conversation.id,
            message: reply,
        })
    }

    /// Full transcript of a conversation.
    ///
    /// Conversations started by a signed-in visitor are visible to that
    /// visitor, the listing owner and admins; anonymous ones to anyone with
    /// the id.
    pub async fn transcript(
        &self,
        viewer: Option<&User>,
        conversation_id: i64,
    ) -> Result<AgentTranscript, CoreError> {
        let conversation = self.agents.get_conversation(conversation_id).await?;
        if !self.can_view(viewer, &conversation).await? {
            return Err(CoreError::NotFound(format!(
                "conversation {conversation_id}"
            )));
        }
        let messages: Vec<AgentMessage> = self.agents.list_messages(conversation_id).await?;
        Ok(AgentTranscript {
            conversation,
            messages,
        })
    }

    async fn can_view(
        &self,
        viewer: Option<&User>,
        conversation: &AgentConversation,
    ) -> Result<bool, CoreError> {
        let Some(visitor_id) = conversation.visitor_id else {
            return Ok(true);
        };
        let Some(viewer) = viewer else {
            return Ok(false);
        };
        if viewer.id == visitor_id || viewer.is_admin() {
            return Ok(true);
        }
        let business = self.businesses.get_by_id(conversation.business_id).await?;
        Ok(business.owner_id == viewer.id)
    }
}

/// System prompt for a listing's agent: the owner's instructions followed
/// by the facts the agent may quote.
pub fn build_system_prompt(business: &Business, services: &[Service]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are the AI assistant for \"{}\", a {} business on the Mercato marketplace.",
        business.name, business.category
    );
    if let Some(city) = &business.city {
        let _ = writeln!(prompt, "Location: {city}.");
    }
    if let Some(description) = &business.description {
        let _ = writeln!(prompt, "About: {description}");
    }
    if !services.is_empty() {
        prompt.push_str("Services offered:\n");
        for service in services {
            let _ = write!(
                prompt,
                "- {}: {}",
                service.name,
                format_cents(service.price_cents)
            );
            if let Some(minutes) = service.duration_minutes {
                let _ = write!(prompt, " ({minutes} min)");
            }
            prompt.push('\n');
        }
    }
    prompt.push_str("Only answer with information about this business. If unsure, say so.\n");
    if let Some(instructions) = &business.ai_prompt {
        prompt.push_str("\nOwner instructions:\n");
        prompt.push_str(instructions.trim());
        prompt.push('\n');
    }
    prompt
}

fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SubscriptionTier, VerificationStatus};
    use chrono::Utc;

    fn business() -> Business {
        Business {
            id: 1,
            owner_id: 2,
            name: "Mercato Concierge".into(),
            slug: "mercato-concierge".into(),
            description: Some("Finds the right pro for you".into()),
            category: "assistant".into(),
            city: Some("Lisbon".into()),
            phone: None,
            website: None,
            subscription_tier: SubscriptionTier::Free,
            verification_status: VerificationStatus::Unverified,
            is_ai_agent: true,
            ai_prompt: Some("  Be concise.  ".into()),
            ai_price_cents: None,
            rating_avg: 0.0,
            review_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_system_prompt_includes_services_and_instructions() {
        let services = vec![Service {
            id: 1,
            business_id: 1,
            name: "Consultation".into(),
            description: None,
            price_cents: 4_550,
            duration_minutes: Some(30),
            created_at: Utc::now(),
        }];

        let prompt = build_system_prompt(&business(), &services);

        assert!(prompt.contains("\"Mercato Concierge\""));
        assert!(prompt.contains("Location: Lisbon."));
        assert!(prompt.contains("- Consultation: 45.50 (30 min)"));
        assert!(prompt.ends_with("Owner instructions:\nBe concise.\n"));
    }

    #[test]
    fn test_system_prompt_without_services() {
        let prompt = build_system_prompt(&business(), &[]);
        assert!(!prompt.contains("Services offered"));
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(12_000), "120.00");
    }
}
